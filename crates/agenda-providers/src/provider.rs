//! CalendarProvider trait definition.
//!
//! A provider is the calendar collaborator behind the command pipeline. It
//! lists, inserts, patches and deletes events on behalf of a chat user.
//! Every call names the user so that one provider instance can serve many
//! users, each with their own credential.

use std::future::Future;
use std::pin::Pin;

use agenda_core::event::{
    CalendarEventRef, EventDraft, EventPatch, InsertedEvent, PatchedEvent, SearchQuery,
};

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
///
/// Boxing keeps [`CalendarProvider`] object safe so the service can hold an
/// `Arc<dyn CalendarProvider>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The calendar backend used by the command pipeline.
///
/// # Implementation Notes
///
/// - `list_events` returns events ordered by start time, with recurring
///   events expanded into instances
/// - `free_text_query` in the [`SearchQuery`] is a provider-side filter; a
///   provider without full-text search should approximate it with a
///   case-insensitive substring match on the title
/// - A user without a usable credential yields an
///   [`AuthorizationFailed`](crate::ProviderErrorCode::AuthorizationFailed) error
/// - No call is retried internally
pub trait CalendarProvider: Send + Sync {
    /// Returns the name/type of this provider (e.g., "google", "memory").
    fn name(&self) -> &str;

    /// Lists the events inside `query.window`.
    fn list_events<'a>(
        &'a self,
        user_id: &'a str,
        query: &'a SearchQuery,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEventRef>>>;

    /// Inserts a new event.
    fn insert_event<'a>(
        &'a self,
        user_id: &'a str,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<InsertedEvent>>;

    /// Moves an event and merges the optional fields of `patch`.
    fn patch_event<'a>(
        &'a self,
        user_id: &'a str,
        event_id: &'a str,
        patch: &'a EventPatch,
    ) -> BoxFuture<'a, ProviderResult<PatchedEvent>>;

    /// Deletes an event.
    fn delete_event<'a>(
        &'a self,
        user_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>>;
}
