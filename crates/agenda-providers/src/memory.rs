//! In-process calendar provider.
//!
//! [`MemoryProvider`] keeps one calendar per user in memory. It records every
//! call it receives and can be scripted to fail, which makes it the provider
//! of choice for exercising the command pipeline without a network. The CLI
//! also uses it for `--offline` runs.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use agenda_core::civil::EventTime;
use agenda_core::event::{
    CalendarEventRef, EventDraft, EventPatch, InsertedEvent, PatchedEvent, SearchQuery,
};
use tracing::debug;

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider};

/// Which provider operation a call was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    List,
    Insert,
    Patch,
    Delete,
}

/// A call received by the provider, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    List { user_id: String, query: SearchQuery },
    Insert { user_id: String, title: String },
    Patch { user_id: String, event_id: String },
    Delete { user_id: String, event_id: String },
}

impl ProviderCall {
    pub fn kind(&self) -> CallKind {
        match self {
            Self::List { .. } => CallKind::List,
            Self::Insert { .. } => CallKind::Insert,
            Self::Patch { .. } => CallKind::Patch,
            Self::Delete { .. } => CallKind::Delete,
        }
    }
}

/// A stored event with every field the pipeline can write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    pub id: String,
    pub summary: String,
    pub start: EventTime,
    pub end: EventTime,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
}

impl StoredEvent {
    fn to_ref(&self, user_id: &str) -> CalendarEventRef {
        CalendarEventRef::new(&self.id, &self.summary, self.start.clone(), self.end.clone())
            .with_html_link(event_link(user_id, &self.id))
    }

    fn matches_text(&self, needle: &str) -> bool {
        [Some(&self.summary), self.description.as_ref(), self.location.as_ref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

fn event_link(user_id: &str, event_id: &str) -> String {
    format!("memory://{}/{}", user_id, event_id)
}

struct FailureRule {
    kind: CallKind,
    /// Calls of `kind` still allowed to succeed before this rule fires.
    remaining_ok: usize,
    code: ProviderErrorCode,
    message: String,
}

#[derive(Default)]
struct MemoryState {
    calendars: HashMap<String, Vec<StoredEvent>>,
    denied_users: HashSet<String>,
    failures: Vec<FailureRule>,
    calls: Vec<ProviderCall>,
    next_id: u64,
}

impl MemoryState {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("evt-{}", self.next_id)
    }

    /// Fires the first armed rule for `kind`; every rule fires once.
    fn scripted_failure(&mut self, kind: CallKind) -> Option<ProviderError> {
        let idx = self.failures.iter().position(|r| r.kind == kind)?;
        let rule = &mut self.failures[idx];
        if rule.remaining_ok > 0 {
            rule.remaining_ok -= 1;
            return None;
        }
        let rule = self.failures.remove(idx);
        Some(ProviderError::new(rule.code, rule.message))
    }
}

/// An in-memory calendar shared by any number of users.
pub struct MemoryProvider {
    name: String,
    state: Mutex<MemoryState>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            name: "memory".to_string(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds an event and returns its id.
    pub fn add_event(
        &self,
        user_id: &str,
        summary: impl Into<String>,
        start: EventTime,
        end: EventTime,
    ) -> String {
        let mut state = self.state();
        let id = state.next_id();
        state
            .calendars
            .entry(user_id.to_string())
            .or_default()
            .push(StoredEvent {
                id: id.clone(),
                summary: summary.into(),
                start,
                end,
                description: None,
                location: None,
                attendees: Vec::new(),
            });
        id
    }

    /// Makes every call for `user_id` fail with an authorization error.
    pub fn deny_user(&self, user_id: &str) {
        self.state().denied_users.insert(user_id.to_string());
    }

    /// Lets `succeed_first` calls of `kind` through, then fails the next one.
    pub fn fail_after(
        &self,
        kind: CallKind,
        succeed_first: usize,
        code: ProviderErrorCode,
        message: impl Into<String>,
    ) {
        self.state().failures.push(FailureRule {
            kind,
            remaining_ok: succeed_first,
            code,
            message: message.into(),
        });
    }

    /// The user's events, ordered by start.
    pub fn events(&self, user_id: &str) -> Vec<StoredEvent> {
        let state = self.state();
        let mut events = state.calendars.get(user_id).cloned().unwrap_or_default();
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        events
    }

    pub fn event(&self, user_id: &str, event_id: &str) -> Option<StoredEvent> {
        self.events(user_id).into_iter().find(|e| e.id == event_id)
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, kind: CallKind) -> usize {
        self.state().calls.iter().filter(|c| c.kind() == kind).count()
    }

    /// Records the call, then applies the denial list and scripted failures.
    fn begin(&self, call: ProviderCall, user_id: &str) -> ProviderResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.state();
        let kind = call.kind();
        state.calls.push(call);

        if state.denied_users.contains(user_id) {
            return Err(ProviderError::authorization(format!(
                "no calendar credential for user {}",
                user_id
            ))
            .with_provider(&self.name));
        }
        if let Some(err) = state.scripted_failure(kind) {
            return Err(err.with_provider(&self.name));
        }
        Ok(state)
    }

    fn list_sync(&self, user_id: &str, query: &SearchQuery) -> ProviderResult<Vec<CalendarEventRef>> {
        let call = ProviderCall::List {
            user_id: user_id.to_string(),
            query: query.clone(),
        };
        let state = self.begin(call, user_id)?;

        let needle = query.free_text_query.as_deref().map(|q| q.trim().to_lowercase());
        let window_start = query.window.start;
        let window_end = query.window.end;

        let mut events: Vec<&StoredEvent> = state
            .calendars
            .get(user_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.end.to_utc_datetime() > window_start && e.start.to_utc_datetime() < window_end)
                    .filter(|e| needle.as_deref().is_none_or(|n| e.matches_text(n)))
                    .collect()
            })
            .unwrap_or_default();
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

        debug!(
            provider = %self.name,
            user_id,
            q = ?query.free_text_query,
            count = events.len(),
            "listed events"
        );
        Ok(events.into_iter().map(|e| e.to_ref(user_id)).collect())
    }

    fn insert_sync(&self, user_id: &str, draft: &EventDraft) -> ProviderResult<InsertedEvent> {
        let call = ProviderCall::Insert {
            user_id: user_id.to_string(),
            title: draft.title.clone(),
        };
        let mut state = self.begin(call, user_id)?;
        let id = state.next_id();
        state
            .calendars
            .entry(user_id.to_string())
            .or_default()
            .push(StoredEvent {
                id: id.clone(),
                summary: draft.title.clone(),
                start: EventTime::from_datetime(draft.start),
                end: EventTime::from_datetime(draft.end),
                description: Some(draft.description.clone()).filter(|d| !d.is_empty()),
                location: draft.location.clone(),
                attendees: draft.attendees.clone(),
            });
        Ok(InsertedEvent {
            html_link: Some(event_link(user_id, &id)),
            id,
        })
    }

    fn patch_sync(&self, user_id: &str, event_id: &str, patch: &EventPatch) -> ProviderResult<PatchedEvent> {
        let call = ProviderCall::Patch {
            user_id: user_id.to_string(),
            event_id: event_id.to_string(),
        };
        let mut state = self.begin(call, user_id)?;
        let event = state
            .calendars
            .get_mut(user_id)
            .and_then(|events| events.iter_mut().find(|e| e.id == event_id))
            .ok_or_else(|| {
                ProviderError::not_found(format!("event {} not found", event_id)).with_provider(&self.name)
            })?;

        event.start = EventTime::from_datetime(patch.start);
        event.end = EventTime::from_datetime(patch.end);
        if let Some(ref description) = patch.metadata.description {
            event.description = Some(description.clone());
        }
        if let Some(ref location) = patch.metadata.location {
            event.location = Some(location.clone());
        }
        if let Some(ref attendees) = patch.metadata.attendees {
            event.attendees = attendees.clone();
        }

        Ok(PatchedEvent {
            id: event.id.clone(),
            summary: event.summary.clone(),
            html_link: Some(event_link(user_id, event_id)),
        })
    }

    fn delete_sync(&self, user_id: &str, event_id: &str) -> ProviderResult<()> {
        let call = ProviderCall::Delete {
            user_id: user_id.to_string(),
            event_id: event_id.to_string(),
        };
        let mut state = self.begin(call, user_id)?;
        let events = state.calendars.entry(user_id.to_string()).or_default();
        let before = events.len();
        events.retain(|e| e.id != event_id);
        if events.len() == before {
            return Err(ProviderError::not_found(format!("event {} not found", event_id))
                .with_provider(&self.name));
        }
        Ok(())
    }
}

impl CalendarProvider for MemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_events<'a>(
        &'a self,
        user_id: &'a str,
        query: &'a SearchQuery,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEventRef>>> {
        Box::pin(async move { self.list_sync(user_id, query) })
    }

    fn insert_event<'a>(
        &'a self,
        user_id: &'a str,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<InsertedEvent>> {
        Box::pin(async move { self.insert_sync(user_id, draft) })
    }

    fn patch_event<'a>(
        &'a self,
        user_id: &'a str,
        event_id: &'a str,
        patch: &'a EventPatch,
    ) -> BoxFuture<'a, ProviderResult<PatchedEvent>> {
        Box::pin(async move { self.patch_sync(user_id, event_id, patch) })
    }

    fn delete_event<'a>(
        &'a self,
        user_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.delete_sync(user_id, event_id) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenda_core::civil::{CivilOffset, TimeWindow};
    use agenda_core::event::EventMetadata;
    use chrono::{DateTime, Duration, FixedOffset, NaiveDate};

    fn at(d: u32, h: u32) -> DateTime<FixedOffset> {
        CivilOffset::default().localize(
            NaiveDate::from_ymd_opt(2024, 6, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap(),
        )
    }

    fn seed(provider: &MemoryProvider, user: &str, summary: &str, d: u32, h: u32) -> String {
        provider.add_event(
            user,
            summary,
            EventTime::from_datetime(at(d, h)),
            EventTime::from_datetime(at(d, h) + Duration::hours(1)),
        )
    }

    fn june() -> TimeWindow {
        TimeWindow::new(at(1, 0), at(30, 23))
    }

    #[tokio::test]
    async fn list_orders_by_start_and_filters_window() {
        let provider = MemoryProvider::new();
        seed(&provider, "u1", "Tarde", 3, 18);
        seed(&provider, "u1", "Mañana", 3, 8);
        provider.add_event(
            "u1",
            "Julio",
            EventTime::from_datetime(at(1, 0) + Duration::days(40)),
            EventTime::from_datetime(at(1, 1) + Duration::days(40)),
        );

        let events = provider
            .list_events("u1", &SearchQuery::window(june()))
            .await
            .unwrap();
        let titles: Vec<_> = events.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(titles, vec!["Mañana", "Tarde"]);
    }

    #[tokio::test]
    async fn free_text_query_is_case_insensitive_substring() {
        let provider = MemoryProvider::new();
        seed(&provider, "u1", "Gym", 2, 7);
        seed(&provider, "u1", "Gym Extra", 4, 7);
        seed(&provider, "u1", "Cena", 4, 20);

        let events = provider
            .list_events("u1", &SearchQuery::by_title("gym", june()))
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.summary.starts_with("Gym")));
    }

    #[tokio::test]
    async fn calendars_are_per_user() {
        let provider = MemoryProvider::new();
        seed(&provider, "u1", "Gym", 2, 7);
        let events = provider
            .list_events("u2", &SearchQuery::window(june()))
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn insert_patch_delete_cycle() {
        let provider = MemoryProvider::new();
        let draft = EventDraft::new("Cena", at(5, 20), at(5, 21))
            .unwrap()
            .with_description("Creado desde Telegram");
        let inserted = provider.insert_event("u1", &draft).await.unwrap();
        assert!(inserted.html_link.as_deref().unwrap().starts_with("memory://u1/"));

        let patch = EventPatch::new(at(6, 20), at(6, 22)).unwrap().with_metadata(EventMetadata {
            location: Some("Centro".into()),
            ..EventMetadata::default()
        });
        let patched = provider.patch_event("u1", &inserted.id, &patch).await.unwrap();
        assert_eq!(patched.summary, "Cena");

        let stored = provider.event("u1", &inserted.id).unwrap();
        assert_eq!(stored.start, EventTime::from_datetime(at(6, 20)));
        assert_eq!(stored.location.as_deref(), Some("Centro"));
        assert_eq!(stored.description.as_deref(), Some("Creado desde Telegram"));

        provider.delete_event("u1", &inserted.id).await.unwrap();
        assert!(provider.events("u1").is_empty());

        let err = provider.delete_event("u1", &inserted.id).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NotFound);
    }

    #[tokio::test]
    async fn denied_user_gets_authorization_error() {
        let provider = MemoryProvider::new();
        provider.deny_user("intruso");
        let err = provider
            .list_events("intruso", &SearchQuery::window(june()))
            .await
            .unwrap_err();
        assert!(err.is_credential_problem());
        assert_eq!(err.provider(), Some("memory"));
        assert_eq!(provider.call_count(CallKind::List), 1);
    }

    #[tokio::test]
    async fn scripted_failure_fires_once_after_successes() {
        let provider = MemoryProvider::new();
        let a = seed(&provider, "u1", "Gym", 2, 7);
        let b = seed(&provider, "u1", "Gym", 3, 7);
        let c = seed(&provider, "u1", "Gym", 4, 7);
        provider.fail_after(CallKind::Delete, 1, ProviderErrorCode::ServerError, "backend down");

        assert!(provider.delete_event("u1", &a).await.is_ok());
        let err = provider.delete_event("u1", &b).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert!(provider.delete_event("u1", &c).await.is_ok());

        let deleted: Vec<_> = provider
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::Delete { event_id, .. } => Some(event_id),
                _ => None,
            })
            .collect();
        assert_eq!(deleted, vec![a, b.clone(), c]);
        assert!(provider.event("u1", &b).is_some());
    }
}
