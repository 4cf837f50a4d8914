//! Error types for calendar provider calls.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
///
/// The command pipeline only distinguishes credential problems from
/// everything else; the finer codes are kept for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The credential was rejected (expired or revoked token, HTTP 401).
    AuthenticationFailed,
    /// No credential for the user, or the calendar refuses access (HTTP 403).
    AuthorizationFailed,
    /// Connection failed, timed out or could not resolve.
    NetworkError,
    /// Quota exhausted (HTTP 429).
    RateLimited,
    /// HTTP 5xx.
    ServerError,
    /// The response body could not be parsed.
    InvalidResponse,
    /// The event or calendar does not exist (HTTP 404/410).
    NotFound,
    /// The provider rejected the request (HTTP 400).
    BadRequest,
    /// Missing or invalid provider configuration.
    ConfigurationError,
}

impl ProviderErrorCode {
    /// Returns true if this error is transient and the operation may be retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns true if the user must re-authorize before calls can succeed.
    pub fn is_credential_problem(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::AuthorizationFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed calendar provider call.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// The provider that failed (e.g. "google", "memory").
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn is_credential_problem(&self) -> bool {
        self.code.is_credential_problem()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_codes() {
        assert!(ProviderErrorCode::AuthenticationFailed.is_credential_problem());
        assert!(ProviderErrorCode::AuthorizationFailed.is_credential_problem());
        assert!(!ProviderErrorCode::RateLimited.is_credential_problem());
        assert!(!ProviderErrorCode::NotFound.is_credential_problem());
    }

    #[test]
    fn retryable_codes() {
        assert!(ProviderErrorCode::NetworkError.is_retryable());
        assert!(ProviderErrorCode::ServerError.is_retryable());
        assert!(!ProviderErrorCode::AuthorizationFailed.is_retryable());
    }

    #[test]
    fn display_includes_provider_and_code() {
        let err = ProviderError::rate_limited("quota exceeded").with_provider("google");
        assert_eq!(err.to_string(), "[google] rate_limited: quota exceeded");
    }

    #[test]
    fn source_is_kept() {
        use std::error::Error;
        let io_err = std::io::Error::other("reset by peer");
        let err = ProviderError::network("list failed")
            .with_provider("google")
            .with_source(io_err);
        assert!(err.source().is_some());
        assert!(err.is_retryable());
        assert_eq!(err.provider(), Some("google"));
    }
}
