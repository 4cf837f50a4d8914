//! Google Calendar provider implementation.
//!
//! [`GoogleCalendarProvider`] lists, inserts, patches and deletes events in
//! one Google calendar through the Calendar API v3.
//!
//! # Credentials
//!
//! Each chat user authorizes their own calendar. The provider asks a
//! [`CredentialSource`] for the user's bearer token before every call; a
//! user without one gets an `authorization_failed` error. Token exchange
//! and refresh happen elsewhere.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use agenda_providers::google::{GoogleCalendarProvider, GoogleConfig, StaticCredentials};
//!
//! let credentials = StaticCredentials::new().with_token("123456", "ya29.a0...");
//! let provider = GoogleCalendarProvider::new(
//!     GoogleConfig::new().with_time_zone("America/Mexico_City"),
//!     Arc::new(credentials),
//! )?;
//! ```

mod client;
mod config;
mod provider;

pub use client::GoogleCalendarClient;
pub use config::{CredentialSource, GoogleConfig, StaticCredentials};
pub use provider::GoogleCalendarProvider;
