//! Command strategies, event resolution and orchestration.
//!
//! This crate turns a chat message into calendar calls:
//! - [`CommandStrategy`] validates a command and builds its request
//! - [`EventResolver`] finds the events an update or delete applies to
//! - [`Orchestrator`] runs the whole pipeline and renders the reply
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use agenda_providers::MemoryProvider;
//! use agenda_service::{Orchestrator, ServiceConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let provider = Arc::new(MemoryProvider::new());
//! let orchestrator = Orchestrator::new(provider, ServiceConfig::default());
//!
//! let outcome = orchestrator
//!     .handle("42", "/agendar Gym | mañana 18:00", chrono::Utc::now())
//!     .await;
//! assert!(outcome.is_success());
//! # }
//! ```

mod config;
mod error;
mod orchestrator;
mod resolver;
mod strategy;

pub use config::{DEFAULT_DESCRIPTION, SearchWindows, ServiceConfig};
pub use error::{ServiceError, ServiceResult, ValidationError};
pub use orchestrator::{HELP_HINT, Orchestrator, UNKNOWN_COMMAND_MESSAGE};
pub use resolver::EventResolver;
pub use strategy::{
    CommandStrategy, EventFields, HELP_MESSAGE, Payload, Validated, WELCOME_MESSAGE,
};
