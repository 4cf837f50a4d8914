//! Service configuration.

use agenda_core::{CivilOffset, FormatOptions};
use serde::{Deserialize, Serialize};

/// Description given to created events when the user supplied none.
pub const DEFAULT_DESCRIPTION: &str = "Creado desde Telegram";

/// Time ranges searched when resolving an event title.
///
/// Update and delete search asymmetrically: update looks further ahead and
/// falls back to a window around the new start, delete falls back to a scan
/// of the upcoming months only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchWindows {
    /// Months before now covered by the global update search.
    pub update_months_before: u32,
    /// Months after now covered by the global update search.
    pub update_months_after: u32,
    /// Days on each side of the new start covered by the local update search.
    pub update_local_days: u32,
    /// Months before now covered by the global delete search.
    pub delete_months_before: u32,
    /// Months after now covered by the global delete search.
    pub delete_months_after: u32,
    /// Months after now covered by the delete fallback scan.
    pub delete_scan_months: u32,
}

impl Default for SearchWindows {
    fn default() -> Self {
        Self {
            update_months_before: 12,
            update_months_after: 24,
            update_local_days: 7,
            delete_months_before: 12,
            delete_months_after: 12,
            delete_scan_months: 3,
        }
    }
}

impl SearchWindows {
    /// Upper bound for every month field.
    pub const MAX_MONTHS: u32 = 1200;
    /// Upper bound for `update_local_days`.
    pub const MAX_LOCAL_DAYS: u32 = 3650;

    /// Validates the windows.
    pub fn validate(&self) -> Result<(), String> {
        let months = [
            ("update_months_before", self.update_months_before),
            ("update_months_after", self.update_months_after),
            ("delete_months_before", self.delete_months_before),
            ("delete_months_after", self.delete_months_after),
            ("delete_scan_months", self.delete_scan_months),
        ];
        if let Some((name, value)) = months.iter().find(|(_, v)| *v > Self::MAX_MONTHS) {
            return Err(format!("{} must be at most {} (got {})", name, Self::MAX_MONTHS, value));
        }
        if self.update_local_days > Self::MAX_LOCAL_DAYS {
            return Err(format!(
                "update_local_days must be at most {} (got {})",
                Self::MAX_LOCAL_DAYS,
                self.update_local_days
            ));
        }
        if self.update_months_before == 0 && self.update_months_after == 0 {
            return Err("update search window is empty".to_string());
        }
        if self.delete_months_before == 0 && self.delete_months_after == 0 {
            return Err("delete search window is empty".to_string());
        }
        if self.delete_scan_months == 0 {
            return Err("delete_scan_months must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Civil offset every date is resolved and rendered in.
    pub offset: CivilOffset,

    /// Description of created events without one.
    pub default_description: String,

    /// Search ranges used by the event resolver.
    pub windows: SearchWindows,

    /// Rendering of agenda listings.
    pub format: FormatOptions,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            offset: CivilOffset::default(),
            default_description: DEFAULT_DESCRIPTION.to_string(),
            windows: SearchWindows::default(),
            format: FormatOptions::default(),
        }
    }
}

impl ServiceConfig {
    pub fn new(offset: CivilOffset) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }

    /// Builder: set the description of created events without one.
    pub fn with_default_description(mut self, description: impl Into<String>) -> Self {
        self.default_description = description.into();
        self
    }

    /// Builder: set the search windows.
    pub fn with_windows(mut self, windows: SearchWindows) -> Self {
        self.windows = windows;
        self
    }

    /// Builder: set the listing format.
    pub fn with_format(mut self, format: FormatOptions) -> Self {
        self.format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.offset.minutes(), -360);
        assert_eq!(config.default_description, "Creado desde Telegram");
        assert_eq!(config.windows.update_months_after, 24);
        assert_eq!(config.windows.delete_scan_months, 3);
        assert!(config.windows.validate().is_ok());
    }

    #[test]
    fn custom_config() {
        let windows = SearchWindows {
            update_local_days: 3,
            ..Default::default()
        };
        let config = ServiceConfig::new(CivilOffset::new(60).unwrap())
            .with_default_description("Creado desde la CLI")
            .with_windows(windows)
            .with_format(FormatOptions {
                max_title_length: Some(20),
                show_links: true,
            });

        assert_eq!(config.offset.render(), "+01:00");
        assert_eq!(config.default_description, "Creado desde la CLI");
        assert_eq!(config.windows.update_local_days, 3);
        assert!(config.format.show_links);
    }

    #[test]
    fn windows_validation() {
        let windows = SearchWindows {
            delete_scan_months: 0,
            ..Default::default()
        };
        assert!(windows.validate().is_err());

        let windows = SearchWindows {
            update_months_before: 0,
            update_months_after: 0,
            ..Default::default()
        };
        assert!(windows.validate().is_err());
    }

    #[test]
    fn windows_reject_huge_values() {
        let windows = SearchWindows {
            update_months_before: u32::MAX,
            update_months_after: 1,
            ..Default::default()
        };
        let err = windows.validate().unwrap_err();
        assert!(err.contains("update_months_before"), "{}", err);

        let windows = SearchWindows {
            delete_months_before: u32::MAX,
            delete_months_after: u32::MAX,
            ..Default::default()
        };
        assert!(windows.validate().is_err());

        let windows = SearchWindows {
            update_local_days: u32::MAX,
            ..Default::default()
        };
        assert!(windows.validate().unwrap_err().contains("update_local_days"));

        assert_eq!(SearchWindows::default().validate(), Ok(()));
    }

    #[test]
    fn windows_deserialize_with_defaults() {
        let windows: SearchWindows =
            serde_json::from_str(r#"{"delete_scan_months": 6}"#).unwrap();
        assert_eq!(windows.delete_scan_months, 6);
        assert_eq!(windows.update_local_days, 7);
    }
}
