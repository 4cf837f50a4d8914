//! Google Calendar provider implementation.
//!
//! This module implements the [`CalendarProvider`] trait for Google Calendar.

use std::sync::Arc;

use agenda_core::event::{
    CalendarEventRef, EventDraft, EventPatch, InsertedEvent, PatchedEvent, SearchQuery,
};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider};

use super::client::GoogleCalendarClient;
use super::config::{CredentialSource, GoogleConfig};

/// Google Calendar provider.
///
/// Every call looks up the user's access token in the configured
/// [`CredentialSource`] and talks to the Calendar API v3 with it.
pub struct GoogleCalendarProvider {
    config: GoogleConfig,
    client: GoogleCalendarClient,
    credentials: Arc<dyn CredentialSource>,
}

impl GoogleCalendarProvider {
    const NAME: &'static str = "google";

    /// Creates a new provider; fails if the configuration is invalid.
    pub fn new(config: GoogleConfig, credentials: Arc<dyn CredentialSource>) -> ProviderResult<Self> {
        config
            .validate()
            .map_err(|e| ProviderError::configuration(e).with_provider(Self::NAME))?;
        let client = GoogleCalendarClient::new(&config).map_err(|e| e.with_provider(Self::NAME))?;

        Ok(Self {
            config,
            client,
            credentials,
        })
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    fn access_token(&self, user_id: &str) -> ProviderResult<String> {
        self.credentials.access_token(user_id).ok_or_else(|| {
            ProviderError::authorization(format!("no calendar credential for user {}", user_id))
                .with_provider(Self::NAME)
        })
    }

    fn tag(&self, err: ProviderError) -> ProviderError {
        err.with_provider(Self::NAME)
    }
}

impl CalendarProvider for GoogleCalendarProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn list_events<'a>(
        &'a self,
        user_id: &'a str,
        query: &'a SearchQuery,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEventRef>>> {
        Box::pin(async move {
            let token = self.access_token(user_id)?;
            debug!(
                user_id,
                calendar = %self.config.calendar_id,
                q = ?query.free_text_query,
                "listing events"
            );
            self.client
                .list_events(&token, query)
                .await
                .map_err(|e| self.tag(e))
        })
    }

    fn insert_event<'a>(
        &'a self,
        user_id: &'a str,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<InsertedEvent>> {
        Box::pin(async move {
            let token = self.access_token(user_id)?;
            self.client
                .insert_event(&token, draft)
                .await
                .map_err(|e| self.tag(e))
        })
    }

    fn patch_event<'a>(
        &'a self,
        user_id: &'a str,
        event_id: &'a str,
        patch: &'a EventPatch,
    ) -> BoxFuture<'a, ProviderResult<PatchedEvent>> {
        Box::pin(async move {
            let token = self.access_token(user_id)?;
            self.client
                .patch_event(&token, event_id, patch)
                .await
                .map_err(|e| self.tag(e))
        })
    }

    fn delete_event<'a>(
        &'a self,
        user_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let token = self.access_token(user_id)?;
            self.client
                .delete_event(&token, event_id)
                .await
                .map_err(|e| self.tag(e))
        })
    }
}
