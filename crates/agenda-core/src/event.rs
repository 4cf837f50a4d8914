//! Calendar event types shared by the providers and the command pipeline.
//!
//! - [`EventDraft`]: a new event, ready for insertion
//! - [`EventPatch`]: a partial update applied to an existing event
//! - [`CalendarEventRef`]: an event as listed by a provider
//! - [`SearchQuery`] and [`MatchPolicy`]: how events are looked up by title

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::civil::{EventTime, TimeWindow};

/// Errors raised when building event values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("event title is empty")]
    EmptyTitle,

    #[error("event end {end} is not after its start {start}")]
    EndNotAfterStart { start: String, end: String },
}

fn check_order(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> Result<(), EventError> {
    if start < end {
        Ok(())
    } else {
        Err(EventError::EndNotAfterStart {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        })
    }
}

/// Optional fields shared by drafts and patches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub description: Option<String>,
    pub location: Option<String>,
    /// Attendee email addresses. `None` leaves attendees untouched on patch.
    pub attendees: Option<Vec<String>>,
}

impl EventMetadata {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.location.is_none() && self.attendees.is_none()
    }
}

/// A new event to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub description: String,
    pub location: Option<String>,
    pub attendees: Vec<String>,
}

impl EventDraft {
    /// Creates a draft; `start` must precede `end`.
    pub fn new(
        title: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Self, EventError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(EventError::EmptyTitle);
        }
        check_order(&start, &end)?;
        Ok(Self {
            title,
            start,
            end,
            description: String::new(),
            location: None,
            attendees: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_attendees(mut self, attendees: Vec<String>) -> Self {
        self.attendees = attendees;
        self
    }
}

/// Fields to change on an existing event. The title never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl EventPatch {
    /// Creates a patch moving an event to `[start, end)`.
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Result<Self, EventError> {
        check_order(&start, &end)?;
        Ok(Self {
            start,
            end,
            metadata: EventMetadata::default(),
        })
    }

    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// An event as returned by a provider listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEventRef {
    /// Provider-specific identifier.
    pub id: String,
    /// Event title; empty when the provider has none.
    pub summary: String,
    pub start: EventTime,
    pub end: EventTime,
    /// Link to the event in the provider's UI.
    pub html_link: Option<String>,
}

impl CalendarEventRef {
    pub fn new(id: impl Into<String>, summary: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        Self {
            id: id.into(),
            summary: summary.into(),
            start,
            end,
            html_link: None,
        }
    }

    pub fn with_html_link(mut self, link: impl Into<String>) -> Self {
        self.html_link = Some(link.into());
        self
    }
}

/// Result of a successful insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertedEvent {
    pub id: String,
    pub html_link: Option<String>,
}

/// Result of a successful patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchedEvent {
    pub id: String,
    pub summary: String,
    pub html_link: Option<String>,
}

/// How a listed event's title is compared with the user's title token.
///
/// Both sides are trimmed and lowercased first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Titles must be equal.
    Exact,
    /// The title must contain the token.
    Contains,
}

impl MatchPolicy {
    pub fn matches(&self, summary: &str, title_token: &str) -> bool {
        let summary = normalize_title(summary);
        let token = normalize_title(title_token);
        match self {
            Self::Exact => summary == token,
            Self::Contains => summary.contains(&token),
        }
    }

    /// Keeps the events whose summary matches `title_token`, preserving order.
    pub fn filter(&self, events: Vec<CalendarEventRef>, title_token: &str) -> Vec<CalendarEventRef> {
        events
            .into_iter()
            .filter(|event| self.matches(&event.summary, title_token))
            .collect()
    }
}

/// Trims and lowercases a title for comparison.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// A provider listing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The user's title token, kept for local filtering.
    pub title_token: String,
    /// Time range to list.
    pub window: TimeWindow,
    /// Provider-side full-text filter; `None` lists everything in the window.
    pub free_text_query: Option<String>,
}

impl SearchQuery {
    /// A listing filtered by the provider's full-text search on the title.
    pub fn by_title(title_token: impl Into<String>, window: TimeWindow) -> Self {
        let title_token = title_token.into();
        Self {
            free_text_query: Some(title_token.clone()),
            title_token,
            window,
        }
    }

    /// An unfiltered listing of the window; matching happens locally.
    pub fn scan(title_token: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            title_token: title_token.into(),
            window,
            free_text_query: None,
        }
    }

    /// A plain listing of the window with no title involved.
    pub fn window(window: TimeWindow) -> Self {
        Self::scan(String::new(), window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::civil::CivilOffset;
    use chrono::NaiveDate;

    fn at(h: u32) -> DateTime<FixedOffset> {
        CivilOffset::default().localize(
            NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap(),
        )
    }

    fn event(summary: &str) -> CalendarEventRef {
        CalendarEventRef::new(summary, summary, EventTime::from_datetime(at(9)), EventTime::from_datetime(at(10)))
    }

    #[test]
    fn draft_requires_increasing_bounds() {
        assert!(EventDraft::new("Cena", at(18), at(19)).is_ok());
        assert!(matches!(
            EventDraft::new("Cena", at(18), at(18)),
            Err(EventError::EndNotAfterStart { .. })
        ));
        assert_eq!(EventDraft::new("  ", at(18), at(19)), Err(EventError::EmptyTitle));
    }

    #[test]
    fn draft_builders() {
        let draft = EventDraft::new("Cena", at(18), at(19))
            .unwrap()
            .with_description("con Ana")
            .with_location("Centro")
            .with_attendees(vec!["ana@example.com".to_string()]);
        assert_eq!(draft.description, "con Ana");
        assert_eq!(draft.location.as_deref(), Some("Centro"));
        assert_eq!(draft.attendees.len(), 1);
    }

    #[test]
    fn patch_requires_increasing_bounds() {
        assert!(EventPatch::new(at(10), at(9)).is_err());
        let patch = EventPatch::new(at(9), at(10)).unwrap();
        assert!(patch.metadata.is_empty());
    }

    #[test]
    fn exact_policy_ignores_case_and_padding() {
        assert!(MatchPolicy::Exact.matches("  GYM ", "gym"));
        assert!(!MatchPolicy::Exact.matches("Gym Extra", "gym"));
    }

    #[test]
    fn contains_policy() {
        assert!(MatchPolicy::Contains.matches("Cena con Ana", "cena"));
        assert!(!MatchPolicy::Contains.matches("Comida", "cena"));
        assert!(MatchPolicy::Contains.matches("", ""));
    }

    #[test]
    fn filter_keeps_order() {
        let events = vec![event("Gym"), event("Gym Extra"), event("gym")];
        let kept = MatchPolicy::Exact.filter(events, "Gym");
        let ids: Vec<_> = kept.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["Gym", "gym"]);
    }

    #[test]
    fn query_constructors() {
        let window = TimeWindow::new(at(0), at(23));
        let by_title = SearchQuery::by_title("Gym", window.clone());
        assert_eq!(by_title.free_text_query.as_deref(), Some("Gym"));
        let scan = SearchQuery::scan("Gym", window.clone());
        assert_eq!(scan.free_text_query, None);
        assert_eq!(scan.title_token, "Gym");
        assert_eq!(SearchQuery::window(window).title_token, "");
    }
}
