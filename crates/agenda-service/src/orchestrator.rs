//! Chat message dispatch.
//!
//! The [`Orchestrator`] turns one chat message into one [`Outcome`]: it
//! classifies the message, runs the matching [`CommandStrategy`], resolves
//! titles for update and delete, applies the calendar calls one at a time
//! and renders the Spanish reply.

use std::sync::Arc;

use agenda_core::civil::EventTime;
use agenda_core::event::{CalendarEventRef, EventPatch, PatchedEvent, SearchQuery};
use agenda_core::format::format_civil;
use agenda_core::{Action, AgendaFormatter, Command};
use agenda_protocol::{DeletedEvent, ErrorCode, Outcome, Request, Response};
use agenda_providers::CalendarProvider;
use chrono::{DateTime, FixedOffset, Utc};
use tracing::{Span, debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::resolver::EventResolver;
use crate::strategy::{CommandStrategy, Payload};

/// Reply to messages that are not a known command.
pub const UNKNOWN_COMMAND_MESSAGE: &str = "⚠️ No entendí tu comando. Escribe `/help` para ayuda.";

/// Appended to validation failures that do not already point to /help.
pub const HELP_HINT: &str = "\n\nEscribe `/help` para ver los formatos.";

/// Carries chat commands out against a calendar provider.
pub struct Orchestrator {
    provider: Arc<dyn CalendarProvider>,
    resolver: EventResolver,
    formatter: AgendaFormatter,
    config: ServiceConfig,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn CalendarProvider>, config: ServiceConfig) -> Self {
        let resolver = EventResolver::new(provider.clone(), config.windows);
        let formatter = AgendaFormatter::new(config.offset, config.format.clone());
        Self {
            provider,
            resolver,
            formatter,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Handles one chat message from `user_id`, with `now` as the current instant.
    #[tracing::instrument(skip(self, message), fields(action, valid, duration_ms))]
    pub async fn handle(&self, user_id: &str, message: &str, now: DateTime<Utc>) -> Outcome {
        let start = std::time::Instant::now();
        let command = Command::parse(message);
        Span::current().record("action", command.action.as_str());

        let outcome = self.dispatch(user_id, &command, now).await;

        let duration = start.elapsed();
        Span::current().record("valid", outcome.is_valid);
        if tracing::enabled!(tracing::Level::DEBUG) {
            Span::current().record("duration_ms", duration.as_millis());
            debug!(
                action = %command.action,
                success = outcome.is_success(),
                duration_ms = duration.as_millis(),
                "Message handled"
            );
        }
        outcome
    }

    async fn dispatch(&self, user_id: &str, command: &Command, now: DateTime<Utc>) -> Outcome {
        let Some(strategy) = CommandStrategy::for_action(command.action) else {
            debug!(keyword = ?command.keyword, "unknown command");
            return Outcome::rejected(
                Action::Unknown,
                ErrorCode::UnknownCommand,
                UNKNOWN_COMMAND_MESSAGE,
            );
        };
        let action = strategy.action();
        debug!(%action, calendar = action.is_calendar_action(), "dispatching");

        let payload = strategy
            .validate(&command.raw_args, &self.config, now)
            .and_then(|validated| strategy.build_payload(user_id, validated, &self.config));

        let request = match payload {
            Ok(Payload::Info(text)) => return Outcome::info(action, text),
            Ok(Payload::Calendar(request)) => request,
            Err(err) => {
                debug!(%action, error = ?err, "validation failed");
                return Outcome::rejected(action, ErrorCode::Validation, with_help_hint(err.to_string()));
            }
        };

        match self.execute(&request, now).await {
            Ok(response) => {
                let message = self.success_message(&request, &response);
                Outcome::completed(action, request, response, message)
            }
            Err(err) => {
                warn!(
                    %action,
                    user_id = request.user_id(),
                    mutation = request.is_mutation(),
                    error = %err,
                    "command failed"
                );
                let message = err.user_message();
                let response = Response::from_error(err.to_error_response());
                Outcome::completed(action, request, response, message)
            }
        }
    }

    /// Carries out a validated request.
    pub async fn execute(&self, request: &Request, now: DateTime<Utc>) -> ServiceResult<Response> {
        let now_civil: DateTime<FixedOffset> = now.with_timezone(&self.config.offset.fixed());
        debug!(
            user_id = request.user_id(),
            mutation = request.is_mutation(),
            "executing request"
        );
        match request {
            Request::CreateEvent { user_id, event } => {
                let inserted = self
                    .provider
                    .insert_event(user_id, event)
                    .await
                    .map_err(ServiceError::provider)?;
                info!(user_id = %user_id, event_id = %inserted.id, "event created");
                Ok(Response::Created { event: inserted })
            }
            Request::UpdateEvents {
                user_id,
                search_title,
                changes,
            } => {
                let targets = self
                    .resolver
                    .resolve_for_update(user_id, search_title, request.target_start(), now_civil)
                    .await?;
                self.apply_updates(user_id, targets, changes).await
            }
            Request::DeleteEvents {
                user_id,
                search_title,
            } => {
                let targets = self
                    .resolver
                    .resolve_for_delete(user_id, search_title, now_civil)
                    .await?;
                self.apply_deletes(user_id, targets).await
            }
            Request::ListEvents { user_id, window } => {
                let mut events = self
                    .provider
                    .list_events(user_id, &SearchQuery::window(window.clone()))
                    .await
                    .map_err(ServiceError::provider)?;
                events.sort_by(|a, b| a.start.cmp(&b.start));
                Ok(Response::Listed { events })
            }
        }
    }

    /// Patches every target in order; stops at the first failure.
    async fn apply_updates(
        &self,
        user_id: &str,
        targets: Vec<CalendarEventRef>,
        changes: &EventPatch,
    ) -> ServiceResult<Response> {
        let mut patched: Vec<PatchedEvent> = Vec::with_capacity(targets.len());
        for target in targets {
            match self.provider.patch_event(user_id, &target.id, changes).await {
                Ok(event) => {
                    info!(user_id, event_id = %event.id, "event updated");
                    patched.push(event);
                }
                Err(err) if patched.is_empty() => return Err(ServiceError::provider(err)),
                Err(err) => {
                    return Err(ServiceError::PartialFailure {
                        applied: Response::Updated { events: patched },
                        source: err,
                    });
                }
            }
        }
        Ok(Response::Updated { events: patched })
    }

    /// Deletes every target in order; stops at the first failure.
    async fn apply_deletes(
        &self,
        user_id: &str,
        targets: Vec<CalendarEventRef>,
    ) -> ServiceResult<Response> {
        let mut deleted: Vec<DeletedEvent> = Vec::with_capacity(targets.len());
        for target in targets {
            match self.provider.delete_event(user_id, &target.id).await {
                Ok(()) => {
                    info!(user_id, event_id = %target.id, "event deleted");
                    deleted.push(DeletedEvent {
                        id: target.id,
                        summary: target.summary,
                    });
                }
                Err(err) if deleted.is_empty() => return Err(ServiceError::provider(err)),
                Err(err) => {
                    return Err(ServiceError::PartialFailure {
                        applied: Response::Deleted { events: deleted },
                        source: err,
                    });
                }
            }
        }
        Ok(Response::Deleted { events: deleted })
    }

    fn success_message(&self, request: &Request, response: &Response) -> String {
        match (request, response) {
            (Request::CreateEvent { event, .. }, Response::Created { event: inserted }) => {
                let when = EventTime::from_datetime(event.start)
                    .civil(self.config.offset)
                    .map(format_civil)
                    .unwrap_or_default();
                let mut message = format!("✅ **Evento creado:** {}\n🕒 {} hrs", event.title, when);
                if let Some(ref link) = inserted.html_link {
                    message.push_str("\n🔗 ");
                    message.push_str(link);
                }
                message
            }
            (Request::UpdateEvents { .. }, Response::Updated { events }) => {
                let titles: Vec<&str> = events.iter().map(|e| e.summary.as_str()).collect();
                format!(
                    "✅ **{} evento(s) actualizado(s):**\n{}",
                    events.len(),
                    self.formatter.format_titles(&titles)
                )
            }
            (Request::DeleteEvents { .. }, Response::Deleted { events }) => {
                let titles: Vec<&str> = events.iter().map(|e| e.summary.as_str()).collect();
                format!(
                    "🗑️ **{} evento(s) eliminado(s):**\n{}",
                    events.len(),
                    self.formatter.format_titles(&titles)
                )
            }
            (_, Response::Listed { events }) => self.formatter.format_agenda(events),
            _ => String::new(),
        }
    }
}

/// Points the user to /help unless the message already does.
fn with_help_hint(message: String) -> String {
    if message.contains("/help") {
        message
    } else {
        message + HELP_HINT
    }
}
