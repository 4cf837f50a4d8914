//! Per-action command validation and request building.
//!
//! Every action the bot understands is one [`CommandStrategy`] variant. A
//! strategy first validates the raw argument string into [`Validated`]
//! fields, then turns those fields into a [`Payload`]: either a calendar
//! [`Request`] or a static reply.
//!
//! Create and update share the argument shape
//! `Title | Start [| End] [| key: value]...`:
//!
//! - the end is taken from the third part only if that part is a date,
//!   otherwise the event lasts one wall-clock hour
//! - the remaining parts are metadata; `descripción`, `ubicación` and
//!   `asistentes` are recognized, other keys are ignored

use std::sync::LazyLock;

use agenda_core::civil::{ParsedInstant, TimeWindow};
use agenda_core::event::{EventDraft, EventError, EventMetadata, EventPatch};
use agenda_core::{Action, DateTimeResolver};
use agenda_protocol::Request;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use regex::Regex;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::ValidationError;

/// Reply to `/start` and greetings.
pub const WELCOME_MESSAGE: &str = "👋 ¡Hola! Soy tu asistente de calendario.\n\n\
⚡ **Comando Rápido:**\n`/agendar Título | Fecha Inicio`\n\
_(Se creará un evento de 1 hora automáticamente)_\n\n\
Comandos disponibles:\n\
📅 `/agendar` - Crear eventos\n\
🔍 `/modificar` - Cambiar horario\n\
🗑️ `/cancelar` - Borrar eventos\n\
🗓️ `/checar` - Ver agenda\n\n\
Escribe `/help` para ver todos los detalles.";

/// Reply to `/help` and messages asking for `ayuda`.
pub const HELP_MESSAGE: &str = "📘 **CENTRO DE AYUDA Y COMANDOS**\n\n\
📅 **1. AGENDAR EVENTOS**\n\
Tienes dos formas de crear eventos:\n\
🔹 **Rápida (1 hora automática):**\n\
`/agendar Título | Fecha Inicio`\n\
Ej: `/agendar Gym | hoy a las 18:00`\n\n\
🔹 **Completa (Inicio y Fin):**\n\
`/agendar Título | Inicio | Fin`\n\
Ej: `/agendar Reunión | mañana 9am | mañana 10:30am`\n\n\
--------------------------------\n\n\
🔍 **2. MODIFICAR EVENTOS**\n\
Busca por título y cambia el horario:\n\
🔹 **Rápida (Mover a nueva hora):**\n\
`/modificar Título | Nueva Inicio`\n\
Ej: `/modificar Gym | hoy 19:00`\n\n\
🔹 **Completa (Cambiar todo):**\n\
`/modificar Título | Inicio | Fin`\n\n\
--------------------------------\n\n\
✨ **3. OPCIONES EXTRAS**\n\
Al Agendar o Modificar, agrega detalles al final con `|`:\n\
📝 `| Descripción: nota del evento`\n\
📍 `| Ubicación: lugar o link`\n\
👥 `| Asistentes: correo1@gmail.com, correo2@hotmail.com`\n\n\
💡 *Ejemplo Pro:*\n\
`/agendar Cita Dr | 15 de marzo 16:00 | Ubicación: Clinica | Descripción: Llevar estudios`\n\n\
--------------------------------\n\n\
🗓️ **4. CONSULTAR AGENDA**\n\
Puedes ver tu agenda por día o por rango:\n\
• `/checar hoy`\n\
• `/checar mañana`\n\
• `/checar 1 semana` (Próximos 7 días)\n\
• `/checar 15 dias`\n\
• `/checar 1 mes`\n\n\
--------------------------------\n\n\
🗑️ **5. CANCELAR**\n\
`/cancelar Título Exacto`";

const CREATE_USAGE: &str = "/agendar Título | Fecha Inicio";
const UPDATE_USAGE: &str = "/modificar Título | Nueva Inicio";

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s*(d[ií]as?|semanas?|mes(?:es)?)$").expect("range pattern is valid")
});

/// The validated fields of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
    /// Create and update: title (or search title), time range and metadata.
    Event(EventFields),
    /// Delete: the title to remove.
    Title(String),
    /// Check: the range to list.
    Window(TimeWindow),
    /// Welcome and help need nothing.
    Static,
}

/// Title, range and metadata shared by create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFields {
    pub title: String,
    pub start: ParsedInstant,
    pub end: ParsedInstant,
    pub metadata: EventMetadata,
}

/// What a validated command turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A calendar operation to carry out.
    Calendar(Request),
    /// A static reply; no calendar call.
    Info(&'static str),
}

/// One variant per chat action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStrategy {
    Create,
    Update,
    Delete,
    Check,
    Welcome,
    Help,
}

impl CommandStrategy {
    /// The strategy handling `action`; unknown commands have none.
    pub fn for_action(action: Action) -> Option<Self> {
        match action {
            Action::Create => Some(Self::Create),
            Action::Update => Some(Self::Update),
            Action::Delete => Some(Self::Delete),
            Action::Check => Some(Self::Check),
            Action::Welcome => Some(Self::Welcome),
            Action::Help => Some(Self::Help),
            Action::Unknown => None,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            Self::Create => Action::Create,
            Self::Update => Action::Update,
            Self::Delete => Action::Delete,
            Self::Check => Action::Check,
            Self::Welcome => Action::Welcome,
            Self::Help => Action::Help,
        }
    }

    /// Checks `args` and extracts the fields the payload is built from.
    ///
    /// Dates are resolved against `now` at the configured civil offset.
    pub fn validate(
        &self,
        args: &str,
        config: &ServiceConfig,
        now: DateTime<Utc>,
    ) -> Result<Validated, ValidationError> {
        let resolver = DateTimeResolver::new(config.offset);
        match self {
            Self::Create => validate_event(args, &resolver, now, false).map(Validated::Event),
            Self::Update => validate_event(args, &resolver, now, true).map(Validated::Event),
            Self::Delete => {
                let title = args.trim();
                if title.is_empty() {
                    return Err(ValidationError::MissingDeleteTitle);
                }
                Ok(Validated::Title(title.to_string()))
            }
            Self::Check => validate_range(args, &resolver, now).map(Validated::Window),
            Self::Welcome | Self::Help => Ok(Validated::Static),
        }
    }

    /// Builds the payload for `user_id` from fields returned by [`validate`](Self::validate).
    pub fn build_payload(
        &self,
        user_id: &str,
        validated: Validated,
        config: &ServiceConfig,
    ) -> Result<Payload, ValidationError> {
        let payload = match (self, validated) {
            (Self::Welcome, _) => Payload::Info(WELCOME_MESSAGE),
            (Self::Help, _) => Payload::Info(HELP_MESSAGE),
            (Self::Create, Validated::Event(fields)) => {
                let EventMetadata {
                    description,
                    location,
                    attendees,
                } = fields.metadata;
                let mut draft = EventDraft::new(
                    fields.title,
                    fields.start.to_datetime(),
                    fields.end.to_datetime(),
                )
                .map_err(|e| event_error(e, self))?
                .with_description(description.unwrap_or_else(|| config.default_description.clone()))
                .with_attendees(attendees.unwrap_or_default());
                if let Some(location) = location {
                    draft = draft.with_location(location);
                }
                Payload::Calendar(Request::create(user_id, draft))
            }
            (Self::Update, Validated::Event(fields)) => {
                let patch = EventPatch::new(fields.start.to_datetime(), fields.end.to_datetime())
                    .map_err(|e| event_error(e, self))?
                    .with_metadata(fields.metadata);
                Payload::Calendar(Request::update(user_id, fields.title, patch))
            }
            (Self::Delete, Validated::Title(title)) => {
                Payload::Calendar(Request::delete(user_id, title))
            }
            (Self::Check, Validated::Window(window)) => {
                Payload::Calendar(Request::list(user_id, window))
            }
            (strategy, validated) => {
                debug!(?strategy, ?validated, "fields do not belong to this strategy");
                return Err(strategy.missing_fields());
            }
        };
        Ok(payload)
    }

    fn missing_fields(&self) -> ValidationError {
        match self {
            Self::Update => ValidationError::MissingFields { usage: UPDATE_USAGE },
            Self::Delete => ValidationError::MissingDeleteTitle,
            Self::Check => ValidationError::MissingRange,
            _ => ValidationError::MissingFields { usage: CREATE_USAGE },
        }
    }
}

fn event_error(err: EventError, strategy: &CommandStrategy) -> ValidationError {
    match (err, strategy) {
        (EventError::EmptyTitle, CommandStrategy::Update) => ValidationError::EmptySearchTitle,
        (EventError::EmptyTitle, _) => ValidationError::EmptyTitle,
        (EventError::EndNotAfterStart { .. }, CommandStrategy::Update) => {
            ValidationError::NewStartNotBeforeEnd
        }
        (EventError::EndNotAfterStart { .. }, _) => ValidationError::StartNotBeforeEnd,
    }
}

/// Create and update share one argument shape; only their messages differ.
fn validate_event(
    args: &str,
    resolver: &DateTimeResolver,
    now: DateTime<Utc>,
    is_update: bool,
) -> Result<EventFields, ValidationError> {
    let parts: Vec<&str> = args.split('|').map(str::trim).collect();
    if parts.len() < 2 {
        let usage = if is_update { UPDATE_USAGE } else { CREATE_USAGE };
        return Err(ValidationError::MissingFields { usage });
    }

    let title = parts[0];
    if title.is_empty() {
        return Err(if is_update {
            ValidationError::EmptySearchTitle
        } else {
            ValidationError::EmptyTitle
        });
    }

    let start = resolver.resolve(parts[1], now).map_err(|reason| {
        if is_update {
            ValidationError::InvalidNewStart { reason }
        } else {
            ValidationError::InvalidStart {
                text: parts[1].to_string(),
                reason,
            }
        }
    })?;

    let explicit_end = parts
        .get(2)
        .and_then(|text| resolver.resolve(text, now).ok());
    let (end, metadata_from) = match explicit_end {
        Some(end) => (end, 3),
        None => (start.add_one_hour_safe(), 2),
    };

    if start.cmp_instant(&end).is_ge() {
        return Err(if is_update {
            ValidationError::NewStartNotBeforeEnd
        } else {
            ValidationError::StartNotBeforeEnd
        });
    }

    Ok(EventFields {
        title: title.to_string(),
        start,
        end,
        metadata: parse_metadata(parts.get(metadata_from..).unwrap_or_default()),
    })
}

/// Reads `key: value` parts; unknown keys and parts without a colon are skipped.
fn parse_metadata(parts: &[&str]) -> EventMetadata {
    let mut metadata = EventMetadata::default();
    let mut attendees = Vec::new();

    for part in parts {
        let Some((key, value)) = part.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_lowercase().as_str() {
            "descripción" | "descripcion" => {
                metadata.description = (!value.is_empty()).then(|| value.to_string());
            }
            "ubicación" | "ubicacion" => {
                metadata.location = (!value.is_empty()).then(|| value.to_string());
            }
            "asistentes" => attendees.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|email| !email.is_empty())
                    .map(String::from),
            ),
            other => debug!(key = other, "ignoring unknown event field"),
        }
    }

    if !attendees.is_empty() {
        metadata.attendees = Some(attendees);
    }
    metadata
}

/// `hoy`, `<N> días|semanas|meses`, or a single day.
fn validate_range(
    args: &str,
    resolver: &DateTimeResolver,
    now: DateTime<Utc>,
) -> Result<TimeWindow, ValidationError> {
    let text = args.trim().to_lowercase();
    if text.is_empty() {
        return Err(ValidationError::MissingRange);
    }

    let offset = resolver.offset();
    let now_civil: DateTime<FixedOffset> = now.with_timezone(&offset.fixed());

    if text == "hoy" {
        return Ok(TimeWindow::until_end_of_day(now_civil, now_civil.date_naive(), offset));
    }

    if let Some(caps) = RANGE_RE.captures(&text) {
        let until = range_end(now_civil, &caps[1], &caps[2]).ok_or(ValidationError::UnknownRange)?;
        return Ok(TimeWindow::until_end_of_day(now_civil, until.date_naive(), offset));
    }

    match resolver.resolve(&text, now) {
        Ok(instant) => Ok(TimeWindow::whole_day(instant.date(), offset)),
        Err(err) => {
            debug!(text = %text, error = %err, "range not understood");
            Err(ValidationError::UnknownRange)
        }
    }
}

fn range_end(now: DateTime<FixedOffset>, quantity: &str, unit: &str) -> Option<DateTime<FixedOffset>> {
    let quantity: i64 = quantity.parse().ok()?;
    if unit.starts_with("mes") {
        let months = i32::try_from(quantity).ok()?;
        return Some(agenda_core::civil::shift_months(now, months));
    }
    let days = if unit.starts_with("semana") {
        quantity.checked_mul(7)?
    } else {
        quantity
    };
    now.checked_add_signed(Duration::try_days(days)?)
}
