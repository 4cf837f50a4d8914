//! Chat command grammar.
//!
//! Messages are classified in a fixed priority order:
//!
//! 1. `/help`, or any text containing `ayuda`, is a help request.
//! 2. `/start`, or any text containing `hola`, `inicio` or `start`, is a greeting.
//! 3. Text starting with `/` is `/<keyword> <args>`; the keyword picks the action.
//! 4. Anything else is unknown.
//!
//! The substring checks run on the whole lowercased message, so
//! `/agendar Cena hola | mañana` is a greeting rather than a create.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a chat message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
    Check,
    Welcome,
    Help,
    Unknown,
}

impl Action {
    /// Maps a slash keyword (without the slash) to an action.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "agendar" => Self::Create,
            "modificar" => Self::Update,
            "cancelar" => Self::Delete,
            "checar" | "listar" => Self::Check,
            "help" => Self::Help,
            "start" => Self::Welcome,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Check => "check",
            Self::Welcome => "welcome",
            Self::Help => "help",
            Self::Unknown => "unknown",
        }
    }

    /// Actions that go through a command strategy and may touch the calendar.
    pub fn is_calendar_action(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete | Self::Check)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub action: Action,
    /// The lowercased slash keyword, when the message had one.
    pub keyword: Option<String>,
    /// Everything after the first space following the keyword, untrimmed.
    pub raw_args: String,
}

impl Command {
    /// Classifies a chat message.
    pub fn parse(message: &str) -> Self {
        let trimmed = message.trim();
        let lower = trimmed.to_lowercase();

        if lower == "/help" || lower.contains("ayuda") {
            return Self::bare(Action::Help);
        }
        if lower == "/start" || ["hola", "inicio", "start"].iter().any(|w| lower.contains(w)) {
            return Self::bare(Action::Welcome);
        }

        let Some(body) = trimmed.strip_prefix('/') else {
            return Self::bare(Action::Unknown);
        };

        let (keyword, raw_args) = match body.split_once(' ') {
            Some((keyword, rest)) => (keyword, rest),
            None => (body, ""),
        };
        let keyword = keyword.to_lowercase();

        Self {
            action: Action::from_keyword(&keyword),
            keyword: Some(keyword),
            raw_args: raw_args.to_string(),
        }
    }

    fn bare(action: Action) -> Self {
        Self {
            action,
            keyword: None,
            raw_args: String::new(),
        }
    }
}
