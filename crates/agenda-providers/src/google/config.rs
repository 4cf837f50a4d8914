//! Google Calendar provider configuration.

use std::collections::HashMap;
use std::time::Duration;

/// Configuration for the Google Calendar provider.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Calendar every user's events live in. Defaults to `"primary"`.
    pub calendar_id: String,

    /// Base URL of the Calendar API v3.
    pub api_base: String,

    /// Request timeout.
    pub timeout: Duration,

    /// IANA time zone written into inserted and patched events.
    pub time_zone: String,

    /// User agent string for API requests.
    pub user_agent: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            time_zone: Self::DEFAULT_TIME_ZONE.to_string(),
            user_agent: format!("agenda/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub const DEFAULT_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";

    pub const DEFAULT_TIME_ZONE: &'static str = "America/Mexico_City";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    /// Points the client at another API root (a proxy or a test server).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.calendar_id.trim().is_empty() {
            return Err("calendar_id is required".to_string());
        }

        let base = url::Url::parse(&self.api_base)
            .map_err(|e| format!("invalid api_base '{}': {}", self.api_base, e))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(format!("api_base must be http(s), got '{}'", base.scheme()));
        }

        if self.time_zone.trim().is_empty() {
            return Err("time_zone is required".to_string());
        }

        if self.timeout.is_zero() {
            return Err("timeout must be greater than zero".to_string());
        }

        Ok(())
    }
}

/// Supplies the OAuth access token of each chat user.
///
/// Obtaining and refreshing tokens happens outside this crate; the provider
/// only asks for the current one before every call.
pub trait CredentialSource: Send + Sync {
    /// The bearer token for `user_id`, or `None` when the user never
    /// authorized a calendar.
    fn access_token(&self, user_id: &str) -> Option<String>;
}

/// A fixed map of user id to access token.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    tokens: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, user_id: impl Into<String>, token: impl Into<String>) -> Self {
        self.insert(user_id, token);
        self
    }

    pub fn insert(&mut self, user_id: impl Into<String>, token: impl Into<String>) {
        self.tokens.insert(user_id.into(), token.into());
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl CredentialSource for StaticCredentials {
    fn access_token(&self, user_id: &str) -> Option<String> {
        self.tokens
            .get(user_id)
            .filter(|token| !token.trim().is_empty())
            .cloned()
    }
}
