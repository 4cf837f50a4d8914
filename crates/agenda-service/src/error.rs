//! Service error types.

use agenda_core::DateError;
use agenda_protocol::{ErrorCode, ErrorResponse, Response};
use agenda_providers::ProviderError;
use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Reasons a command is rejected before any calendar call.
///
/// The display text is the Spanish reply sent to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("❌ **Faltan datos.**\nUsa: `{usage}`")]
    MissingFields { usage: &'static str },

    #[error("❌ El título no puede estar vacío.")]
    EmptyTitle,

    #[error("❌ Falta el título.")]
    EmptySearchTitle,

    #[error("❌ No entendí la fecha de inicio: \"{text}\".")]
    InvalidStart {
        text: String,
        #[source]
        reason: DateError,
    },

    #[error("❌ Nueva fecha de inicio inválida.")]
    InvalidNewStart {
        #[source]
        reason: DateError,
    },

    #[error("❌ La fecha de inicio debe ser anterior a la de fin.")]
    StartNotBeforeEnd,

    #[error("❌ Inicio debe ser antes del fin.")]
    NewStartNotBeforeEnd,

    #[error("❌ **Falta el título.**\nUsa: `/cancelar Título del Evento`")]
    MissingDeleteTitle,

    #[error("❌ **Falta el rango.**\nEj: `/checar hoy`, `/checar 1 semana`")]
    MissingRange,

    #[error("❌ No entendí el rango.\nIntenta: `/checar 1 semana` o `/checar hoy`")]
    UnknownRange,
}

/// Errors that can occur while carrying out a command.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The command failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No event matched the title, or none survived the re-check.
    #[error("no events found for '{title}'")]
    NotFound { title: String },

    /// Events were found for a delete but none matched the title exactly.
    #[error("similar events found for '{title}' but none matched exactly")]
    SafetyAbort { title: String, similar: Vec<String> },

    /// The user has no usable calendar credential.
    #[error("calendar authorization failed: {0}")]
    Authorization(#[source] ProviderError),

    /// A calendar call failed.
    #[error("calendar call failed: {0}")]
    Transport(#[source] ProviderError),

    /// A mutation failed after earlier ones were applied.
    #[error("{} change(s) applied before failure: {source}", .applied.event_count())]
    PartialFailure {
        applied: Response,
        #[source]
        source: ProviderError,
    },
}

impl ServiceError {
    pub fn not_found(title: impl Into<String>) -> Self {
        Self::NotFound {
            title: title.into(),
        }
    }

    /// Wraps a failed provider call, keeping credential problems apart.
    pub fn provider(err: ProviderError) -> Self {
        if err.is_credential_problem() {
            Self::Authorization(err)
        } else {
            Self::Transport(err)
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::SafetyAbort { .. } => ErrorCode::SafetyAbort,
            Self::Authorization(_) => ErrorCode::Authorization,
            Self::Transport(_) => ErrorCode::Transport,
            Self::PartialFailure { .. } => ErrorCode::PartialFailure,
        }
    }

    /// The Spanish reply for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::NotFound { title } => {
                format!("🔍 No encontré eventos con el título \"{}\".", title)
            }
            Self::SafetyAbort { title, similar } => {
                let mut message = format!(
                    "⚠️ Encontré eventos parecidos a \"{}\", pero ninguno con ese título exacto. No borré nada.",
                    title
                );
                if !similar.is_empty() {
                    message.push_str("\nEventos similares:");
                    for summary in similar {
                        message.push_str("\n• ");
                        message.push_str(summary);
                    }
                }
                message.push_str("\nEscribe el título completo para cancelarlo.");
                message
            }
            Self::Authorization(_) => {
                "🔐 No tengo acceso a tu calendario. Vuelve a vincular tu cuenta de Google.".to_string()
            }
            Self::Transport(err) if err.is_retryable() => {
                "⚠️ No pude comunicarme con tu calendario. Intenta de nuevo en unos minutos.".to_string()
            }
            Self::Transport(_) => "⚠️ Tu calendario rechazó la operación.".to_string(),
            Self::PartialFailure { applied, .. } => format!(
                "⚠️ Se aplicaron {} cambio(s), pero el siguiente falló. Los cambios aplicados se conservan.",
                applied.event_count()
            ),
        }
    }

    /// The protocol form of this failure.
    pub fn to_error_response(&self) -> ErrorResponse {
        let response = ErrorResponse::new(self.code(), self.to_string());
        match self {
            Self::PartialFailure { applied, .. } => response.with_applied(applied.clone()),
            _ => response,
        }
    }
}
