//! CalendarProvider trait and implementations.
//!
//! This crate provides the abstraction layer for calendar backends:
//!
//! - [`CalendarProvider`] - The trait every calendar backend implements
//! - [`MemoryProvider`] - An in-process calendar for tests and offline runs
//! - `google::GoogleCalendarProvider` - Google Calendar API v3 (feature `google`)
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │  Google API     │    │  In-process map │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌──────────────────────┐ ┌────────────────┐
//! │ GoogleCalendarProvider│ │ MemoryProvider │
//! └────────┬─────────────┘ └───────┬────────┘
//!          │   CalendarProvider    │
//!          └──────────┬────────────┘
//!                     ▼
//!          agenda-service EventResolver
//! ```
//!
//! # Example
//!
//! ```ignore
//! use agenda_providers::{CalendarProvider, MemoryProvider};
//! use agenda_core::event::SearchQuery;
//!
//! async fn gyms(provider: &dyn CalendarProvider, query: &SearchQuery) {
//!     let events = provider.list_events("42", query).await?;
//! }
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod memory;
pub mod provider;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use memory::{CallKind, MemoryProvider, ProviderCall, StoredEvent};
pub use provider::{BoxFuture, CalendarProvider};
