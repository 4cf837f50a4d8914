//! CLI error types.

use thiserror::Error;

use crate::secret::SecretError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be read, parsed or validated.
    #[error("configuration error: {0}")]
    Config(String),

    /// A user's access-token reference could not be resolved.
    #[error("credential for user '{user}': {source}")]
    Credential {
        user: String,
        #[source]
        source: SecretError,
    },

    /// `--now` was not an RFC 3339 timestamp.
    #[error("invalid --now value: {0}")]
    InvalidNow(String),

    #[error(transparent)]
    Date(#[from] agenda_core::DateError),

    #[error("provider error: {0}")]
    Provider(#[from] agenda_providers::ProviderError),

    #[error(transparent)]
    Protocol(#[from] agenda_protocol::ProtocolError),

    #[error("failed to initialise logging: {0}")]
    Tracing(#[from] agenda_core::TracingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
