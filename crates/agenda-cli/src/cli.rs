//! Command-line interface definition.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// agenda - Spanish chat commands for your calendar
#[derive(Debug, Parser)]
#[command(name = "agenda")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "AGENDA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Print the full outcome as JSON instead of the reply text
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretend the current time is this RFC 3339 timestamp
    #[arg(long, value_parser = parse_now, global = true)]
    pub now: Option<DateTime<Utc>>,

    /// Use an in-memory calendar instead of Google
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// The injected clock, or the system clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Handle one chat message, e.g. `agenda send -- /agendar Gym | mañana 18:00`
    Send {
        /// Chat user the message comes from
        #[arg(long, short, default_value = "local")]
        user: String,

        /// The chat message; words are joined with spaces
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        message: Vec<String>,
    },

    /// Resolve a Spanish date expression and print the instant
    Date {
        /// Date text, e.g. `5 de agosto 21:00`
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

fn parse_now(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}
