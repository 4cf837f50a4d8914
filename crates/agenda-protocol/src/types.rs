//! Request, response and outcome types.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use agenda_core::event::{
    CalendarEventRef, EventDraft, EventPatch, InsertedEvent, PatchedEvent,
};
use agenda_core::{Action, TimeWindow};

use crate::PROTOCOL_VERSION;

/// A calendar operation built from a validated chat command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Insert one event.
    CreateEvent { user_id: String, event: EventDraft },

    /// Patch every event matching `search_title`.
    UpdateEvents {
        user_id: String,
        search_title: String,
        changes: EventPatch,
    },

    /// Delete every event whose title equals `search_title`.
    DeleteEvents { user_id: String, search_title: String },

    /// List the events inside `window`.
    ListEvents { user_id: String, window: TimeWindow },
}

impl Request {
    pub fn create(user_id: impl Into<String>, event: EventDraft) -> Self {
        Self::CreateEvent {
            user_id: user_id.into(),
            event,
        }
    }

    pub fn update(
        user_id: impl Into<String>,
        search_title: impl Into<String>,
        changes: EventPatch,
    ) -> Self {
        Self::UpdateEvents {
            user_id: user_id.into(),
            search_title: search_title.into(),
            changes,
        }
    }

    pub fn delete(user_id: impl Into<String>, search_title: impl Into<String>) -> Self {
        Self::DeleteEvents {
            user_id: user_id.into(),
            search_title: search_title.into(),
        }
    }

    pub fn list(user_id: impl Into<String>, window: TimeWindow) -> Self {
        Self::ListEvents {
            user_id: user_id.into(),
            window,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Self::CreateEvent { user_id, .. }
            | Self::UpdateEvents { user_id, .. }
            | Self::DeleteEvents { user_id, .. }
            | Self::ListEvents { user_id, .. } => user_id,
        }
    }

    /// The new start of an update, used to centre the local fallback search.
    pub fn target_start(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::UpdateEvents { changes, .. } => Some(changes.start),
            _ => None,
        }
    }

    /// Whether carrying out the request changes the calendar.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::ListEvents { .. })
    }
}

/// An event removed by a delete request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEvent {
    pub id: String,
    pub summary: String,
}

/// What the calendar returned for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Created { event: InsertedEvent },

    /// Patched events, in the order they were listed.
    Updated { events: Vec<PatchedEvent> },

    /// Deleted events, in the order they were listed.
    Deleted { events: Vec<DeletedEvent> },

    Listed { events: Vec<CalendarEventRef> },

    /// Static text with no calendar call (welcome, help).
    Info,

    Error {
        #[serde(flatten)]
        error: ErrorResponse,
    },
}

impl Response {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            error: ErrorResponse::new(code, message),
        }
    }

    pub fn from_error(error: ErrorResponse) -> Self {
        Self::Error { error }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Error { .. })
    }

    pub fn as_error(&self) -> Option<&ErrorResponse> {
        match self {
            Self::Error { error } => Some(error),
            _ => None,
        }
    }

    /// Number of events this response carries.
    pub fn event_count(&self) -> usize {
        match self {
            Self::Created { .. } => 1,
            Self::Updated { events } => events.len(),
            Self::Deleted { events } => events.len(),
            Self::Listed { events } => events.len(),
            Self::Info => 0,
            Self::Error { error } => error.applied.as_ref().map_or(0, |r| r.event_count()),
        }
    }
}

/// Failure categories reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed command, bad date, empty title.
    Validation,
    /// No event matched the title.
    NotFound,
    /// Similar events exist but none matched exactly; nothing was deleted.
    SafetyAbort,
    /// The user has no usable calendar credential.
    Authorization,
    /// A calendar call failed.
    Transport,
    /// Some mutations were applied before a later one failed.
    PartialFailure,
    /// The message is not a known command.
    UnknownCommand,
}

impl ErrorCode {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "The command could not be validated",
            Self::NotFound => "No matching event was found",
            Self::SafetyAbort => "Only similar events were found; nothing was deleted",
            Self::Authorization => "The user has no usable calendar credential",
            Self::Transport => "The calendar provider call failed",
            Self::PartialFailure => "Some changes were applied before a failure",
            Self::UnknownCommand => "The message is not a known command",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    /// Developer-facing detail; the user-facing text lives in [`Outcome::message`].
    pub message: String,
    /// Mutations that went through before the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied: Option<Box<Response>>,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            applied: None,
        }
    }

    pub fn with_applied(mut self, applied: Response) -> Self {
        self.applied = Some(Box::new(applied));
        self
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

fn default_version() -> String {
    PROTOCOL_VERSION.to_string()
}

/// The final reply to one chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(default = "default_version")]
    pub protocol_version: String,
    pub action: Action,
    /// Whether the command passed validation.
    pub is_valid: bool,
    /// Spanish text to send back to the user.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Request>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Response>,
}

impl Outcome {
    fn new(action: Action, is_valid: bool, message: impl Into<String>) -> Self {
        Self {
            protocol_version: default_version(),
            action,
            is_valid,
            message: message.into(),
            request: None,
            response: None,
        }
    }

    /// A welcome or help reply.
    pub fn info(action: Action, message: impl Into<String>) -> Self {
        let mut outcome = Self::new(action, true, message);
        outcome.response = Some(Response::Info);
        outcome
    }

    /// A command rejected before any calendar call.
    pub fn rejected(action: Action, code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut outcome = Self::new(action, false, message.clone());
        outcome.response = Some(Response::error(code, message));
        outcome
    }

    /// A validated command with its calendar request and result.
    pub fn completed(
        action: Action,
        request: Request,
        response: Response,
        message: impl Into<String>,
    ) -> Self {
        let mut outcome = Self::new(action, true, message);
        outcome.request = Some(request);
        outcome.response = Some(response);
        outcome
    }

    pub fn is_success(&self) -> bool {
        self.is_valid && self.response.as_ref().is_none_or(Response::is_success)
    }

    pub fn error(&self) -> Option<&ErrorResponse> {
        self.response.as_ref().and_then(Response::as_error)
    }

    pub fn is_compatible(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenda_core::CivilOffset;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at(d: u32, h: u32) -> DateTime<FixedOffset> {
        CivilOffset::default().localize(
            NaiveDate::from_ymd_opt(2024, 6, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn request_serde_delete() {
        let request = Request::delete("42", "Gym");
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"type":"delete_events","user_id":"42","search_title":"Gym"}"#);

        let parsed: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn request_serde_list_window() {
        let request = Request::list("42", TimeWindow::new(at(1, 10), at(1, 23)));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["type"], "list_events");
        assert_eq!(value["window"]["start"], "2024-06-01T10:00:00-06:00");
        assert_eq!(value["window"]["end"], "2024-06-01T23:00:00-06:00");
    }

    #[test]
    fn request_accessors() {
        let patch = EventPatch::new(at(2, 9), at(2, 10)).unwrap();
        let update = Request::update("7", "cena", patch);
        assert_eq!(update.user_id(), "7");
        assert_eq!(update.target_start(), Some(at(2, 9)));
        assert!(update.is_mutation());
        assert!(!Request::list("7", TimeWindow::new(at(1, 0), at(1, 1))).is_mutation());
    }

    #[test]
    fn error_response_flattens() {
        let response = Response::error(ErrorCode::SafetyAbort, "similar events found");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"type": "error", "code": "safety_abort", "message": "similar events found"})
        );
        assert!(!response.is_success());
    }

    #[test]
    fn partial_failure_carries_applied() {
        let applied = Response::Deleted {
            events: vec![DeletedEvent {
                id: "a".into(),
                summary: "Gym".into(),
            }],
        };
        let error = ErrorResponse::new(ErrorCode::PartialFailure, "second delete failed")
            .with_applied(applied.clone());
        let response = Response::from_error(error);
        assert_eq!(response.event_count(), 1);

        let json = serde_json::to_string(&response).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_error().unwrap().applied.as_deref(), Some(&applied));
    }

    #[test]
    fn outcome_constructors() {
        let info = Outcome::info(Action::Help, "ayuda");
        assert!(info.is_success());
        assert!(info.is_compatible());
        assert_eq!(info.response, Some(Response::Info));

        let rejected = Outcome::rejected(Action::Create, ErrorCode::Validation, "❌ Faltan datos");
        assert!(!rejected.is_valid);
        assert!(!rejected.is_success());
        assert_eq!(rejected.error().unwrap().code, ErrorCode::Validation);
    }

    #[test]
    fn outcome_omits_empty_fields() {
        let value = serde_json::to_value(Outcome::info(Action::Welcome, "hola")).unwrap();
        assert_eq!(
            value,
            json!({
                "protocol_version": "1",
                "action": "welcome",
                "is_valid": true,
                "message": "hola",
                "response": {"type": "info"}
            })
        );
    }

    #[test]
    fn error_code_descriptions() {
        assert!(ErrorCode::SafetyAbort.description().contains("nothing was deleted"));
        assert_eq!(
            serde_json::to_string(&ErrorCode::UnknownCommand).unwrap(),
            r#""unknown_command""#
        );
    }
}
