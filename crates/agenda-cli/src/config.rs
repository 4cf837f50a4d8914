//! CLI configuration.
//!
//! All settings live in a single `config.toml`, at
//! `~/.config/agenda/config.toml` by default:
//!
//! ```toml
//! [calendar]
//! offset_minutes = -360
//! time_zone = "America/Mexico_City"
//! default_description = "Creado desde Telegram"
//!
//! [windows]
//! update_local_days = 7
//!
//! [google]
//! calendar_id = "primary"
//!
//! [users]
//! "123456" = "pass::google/agenda-bot"
//! ```
//!
//! Access tokens under `[users]` support secret references (see [`crate::secret`]).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use agenda_core::{CivilOffset, FormatOptions};
use agenda_service::{DEFAULT_DESCRIPTION, SearchWindows, ServiceConfig};

use crate::error::{CliError, CliResult};

/// Configuration for the agenda CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgendaConfig {
    /// Civil time and event defaults.
    pub calendar: CalendarSettings,

    /// Title search ranges for update and delete.
    pub windows: SearchWindows,

    /// Listing output.
    pub display: DisplaySettings,

    /// Google Calendar settings.
    pub google: GoogleSettings,

    /// Chat user id to access-token reference.
    pub users: BTreeMap<String, String>,
}

/// Civil time and event defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Minutes east of UTC every date is resolved at.
    pub offset_minutes: i32,

    /// IANA zone name sent along with event times.
    pub time_zone: String,

    /// Description of created events without one.
    pub default_description: String,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            offset_minutes: agenda_core::civil::DEFAULT_OFFSET_MINUTES,
            time_zone: "America/Mexico_City".to_string(),
            default_description: DEFAULT_DESCRIPTION.to_string(),
        }
    }
}

/// Listing output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Maximum title length (truncated with ellipsis).
    pub max_title_length: Option<usize>,

    /// Show the calendar link under each listed event.
    pub show_links: bool,
}

/// Google Calendar settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    pub calendar_id: String,

    /// Calendar API root, overridable for proxies and tests.
    pub api_base: Option<String>,

    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            api_base: None,
            timeout: 30,
        }
    }
}

impl AgendaConfig {
    /// Loads configuration from the default path; a missing file gives the defaults.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> CliResult<Self> {
        toml::from_str(content).map_err(|e| CliError::Config(format!("failed to parse config: {}", e)))
    }

    pub fn to_toml(&self) -> CliResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agenda")
    }

    pub fn offset(&self) -> CliResult<CivilOffset> {
        CivilOffset::new(self.calendar.offset_minutes).ok_or_else(|| {
            CliError::Config(format!(
                "calendar.offset_minutes {} is out of range",
                self.calendar.offset_minutes
            ))
        })
    }

    /// Builds the service configuration.
    pub fn service_config(&self) -> CliResult<ServiceConfig> {
        self.windows.validate().map_err(CliError::Config)?;
        Ok(ServiceConfig::new(self.offset()?)
            .with_default_description(self.calendar.default_description.clone())
            .with_windows(self.windows)
            .with_format(FormatOptions {
                max_title_length: self.display.max_title_length,
                show_links: self.display.show_links,
            }))
    }

    /// Checks everything that can be checked without calling the calendar.
    pub fn validate(&self) -> CliResult<()> {
        self.service_config()?;
        if self.calendar.time_zone.trim().is_empty() {
            return Err(CliError::Config("calendar.time_zone must not be empty".into()));
        }
        #[cfg(feature = "google")]
        self.google_config().validate().map_err(CliError::Config)?;
        Ok(())
    }

    /// Converts to the Google provider configuration.
    #[cfg(feature = "google")]
    pub fn google_config(&self) -> agenda_providers::google::GoogleConfig {
        let mut config = agenda_providers::google::GoogleConfig::new()
            .with_calendar_id(self.google.calendar_id.clone())
            .with_time_zone(self.calendar.time_zone.clone())
            .with_timeout(std::time::Duration::from_secs(self.google.timeout));
        if let Some(ref base) = self.google.api_base {
            config = config.with_api_base(base.clone());
        }
        config
    }

    /// Resolves every `[users]` token reference.
    #[cfg(feature = "google")]
    pub fn credentials(&self) -> CliResult<agenda_providers::google::StaticCredentials> {
        let mut credentials = agenda_providers::google::StaticCredentials::new();
        for (user, reference) in &self.users {
            let token = crate::secret::resolve(reference).map_err(|source| CliError::Credential {
                user: user.clone(),
                source,
            })?;
            credentials.insert(user.clone(), token);
        }
        Ok(credentials)
    }
}
