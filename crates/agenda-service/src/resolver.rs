//! Title-based event resolution.
//!
//! Users name events by title, never by id, so update and delete first have
//! to find the events a title refers to. [`EventResolver`] does this in two
//! tiers against the calendar provider:
//!
//! | | tier A (global, text query) | tier B (fallback, no query) | re-check |
//! |---|---|---|---|
//! | update | now −12 to +24 months | ±7 days around the new start | contains |
//! | delete | now −12 to +12 months | now to +3 months | exact |
//!
//! Tier B only runs when tier A returned nothing. The re-check is applied to
//! whatever the tiers returned; a delete whose candidates all fail the exact
//! re-check is a safety abort, not a miss.

use std::sync::Arc;

use agenda_core::civil::TimeWindow;
use agenda_core::event::{CalendarEventRef, MatchPolicy, SearchQuery, normalize_title};
use agenda_providers::CalendarProvider;
use chrono::{DateTime, Duration, FixedOffset};
use tracing::debug;

use crate::config::SearchWindows;
use crate::error::{ServiceError, ServiceResult};

/// Finds the calendar events a user's title refers to.
pub struct EventResolver {
    provider: Arc<dyn CalendarProvider>,
    windows: SearchWindows,
}

impl EventResolver {
    pub fn new(provider: Arc<dyn CalendarProvider>, windows: SearchWindows) -> Self {
        Self { provider, windows }
    }

    pub fn windows(&self) -> &SearchWindows {
        &self.windows
    }

    /// Events to patch for an update of `title`, in listing order.
    ///
    /// `target` is the new start; it centres the fallback search.
    #[tracing::instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn resolve_for_update(
        &self,
        user_id: &str,
        title: &str,
        target: Option<DateTime<FixedOffset>>,
        now: DateTime<FixedOffset>,
    ) -> ServiceResult<Vec<CalendarEventRef>> {
        let token = normalize_title(title);
        let global = TimeWindow::span(
            now,
            self.windows.update_months_before,
            self.windows.update_months_after,
        );

        let mut candidates = self.list(user_id, SearchQuery::by_title(&token, global)).await?;
        debug!(tier = "A", count = candidates.len(), "global search");

        if candidates.is_empty()
            && let Some(target) = target
        {
            let radius = Duration::days(i64::from(self.windows.update_local_days));
            let local = TimeWindow::around(target, radius);
            let listed = self.list(user_id, SearchQuery::scan(&token, local)).await?;
            let listed_count = listed.len();
            candidates = MatchPolicy::Contains.filter(listed, &token);
            debug!(tier = "B", listed = listed_count, count = candidates.len(), "local search");
        }

        if candidates.is_empty() {
            return Err(ServiceError::not_found(token));
        }

        let matched = MatchPolicy::Contains.filter(candidates, &token);
        if matched.is_empty() {
            debug!("candidates found, none contains the title");
            return Err(ServiceError::not_found(token));
        }
        Ok(matched)
    }

    /// Events to delete for `title`, in listing order.
    #[tracing::instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn resolve_for_delete(
        &self,
        user_id: &str,
        title: &str,
        now: DateTime<FixedOffset>,
    ) -> ServiceResult<Vec<CalendarEventRef>> {
        let token = normalize_title(title);
        let global = TimeWindow::span(
            now,
            self.windows.delete_months_before,
            self.windows.delete_months_after,
        );

        let mut candidates = self.list(user_id, SearchQuery::by_title(&token, global)).await?;
        debug!(tier = "A", count = candidates.len(), "global search");

        if candidates.is_empty() {
            let scan = TimeWindow::span(now, 0, self.windows.delete_scan_months);
            let listed = self.list(user_id, SearchQuery::scan(&token, scan)).await?;
            let listed_count = listed.len();
            candidates = MatchPolicy::Exact.filter(listed, &token);
            debug!(tier = "B", listed = listed_count, count = candidates.len(), "forward scan");
        }

        if candidates.is_empty() {
            return Err(ServiceError::not_found(token));
        }

        let similar: Vec<String> = candidates.iter().map(|e| e.summary.clone()).collect();
        let matched = MatchPolicy::Exact.filter(candidates, &token);
        if matched.is_empty() {
            debug!(similar = similar.len(), "no exact match, refusing to delete");
            return Err(ServiceError::SafetyAbort {
                title: token,
                similar,
            });
        }
        Ok(matched)
    }

    async fn list(&self, user_id: &str, query: SearchQuery) -> ServiceResult<Vec<CalendarEventRef>> {
        self.provider
            .list_events(user_id, &query)
            .await
            .map_err(ServiceError::provider)
    }
}
