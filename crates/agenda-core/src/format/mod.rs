//! Spanish rendering of agenda listings and instants.
//!
//! Weekday and month names come from fixed tables so the output does not
//! depend on the host locale. A listing looks like:
//!
//! ```text
//! 🗓️ **Tus Eventos Encontrados (1):**
//!
//! 🕒 Jueves 04 Dic 18:00 hrs
//! 📌 **Cena con Ana**
//!
//! 💡 _Usa /modificar o /cancelar seguido del título para editar._
//! ```

use std::borrow::Cow;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::civil::{CivilOffset, ParsedInstant};
use crate::event::CalendarEventRef;

/// Weekday names, Monday first.
pub const WEEKDAYS: [&str; 7] = [
    "Lunes",
    "Martes",
    "Miércoles",
    "Jueves",
    "Viernes",
    "Sábado",
    "Domingo",
];

/// Abbreviated month names, January first.
pub const MONTHS_SHORT: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// Reply when a listing finds nothing.
pub const EMPTY_AGENDA: &str = "📭 **Agenda vacía**\nNo encontré eventos en este rango de fechas.";

const AGENDA_FOOTER: &str = "💡 _Usa /modificar o /cancelar seguido del título para editar._";

const UNTITLED: &str = "Sin título";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Titles longer than this are cut with an ellipsis.
    pub max_title_length: Option<usize>,
    /// Append the provider link under each event.
    pub show_links: bool,
}

/// Renders listings and confirmations at one civil offset.
#[derive(Debug, Clone, Default)]
pub struct AgendaFormatter {
    offset: CivilOffset,
    options: FormatOptions,
}

impl AgendaFormatter {
    pub fn new(offset: CivilOffset, options: FormatOptions) -> Self {
        Self { offset, options }
    }

    pub fn offset(&self) -> CivilOffset {
        self.offset
    }

    /// The full listing reply for a check command.
    pub fn format_agenda(&self, events: &[CalendarEventRef]) -> String {
        if events.is_empty() {
            return EMPTY_AGENDA.to_string();
        }

        let mut out = format!("🗓️ **Tus Eventos Encontrados ({}):**\n\n", events.len());
        for event in events {
            out.push_str(&self.format_event(event));
            out.push_str("\n\n");
        }
        out.push_str(AGENDA_FOOTER);
        out
    }

    /// One listing block: when, then what.
    pub fn format_event(&self, event: &CalendarEventRef) -> String {
        let when = match event.start.civil(self.offset) {
            Some(civil) => format!("{} hrs", format_civil(civil)),
            None => format!("{} (todo el día)", format_day(event.start.date(self.offset))),
        };
        let mut block = format!("🕒 {}\n📌 **{}**", when, self.title(&event.summary));
        if self.options.show_links
            && let Some(ref link) = event.html_link
        {
            block.push_str("\n🔗 ");
            block.push_str(link);
        }
        block
    }

    /// A bulleted list of titles, used for update and delete confirmations.
    pub fn format_titles(&self, titles: &[&str]) -> String {
        titles
            .iter()
            .map(|t| format!("• {}", self.title(t)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn title<'a>(&self, summary: &'a str) -> Cow<'a, str> {
        let summary = summary.trim();
        if summary.is_empty() {
            return Cow::Borrowed(UNTITLED);
        }
        match self.options.max_title_length {
            Some(max) => ellipsis(summary, max),
            None => Cow::Borrowed(summary),
        }
    }
}

/// `Jueves 04 Dic`
pub fn format_day(date: NaiveDate) -> String {
    let weekday = WEEKDAYS[date.weekday().num_days_from_monday() as usize];
    let month = MONTHS_SHORT[date.month0() as usize];
    format!("{} {:02} {}", weekday, date.day(), month)
}

/// `Jueves 04 Dic 18:00`
pub fn format_civil(civil: NaiveDateTime) -> String {
    format!(
        "{} {:02}:{:02}",
        format_day(civil.date()),
        civil.hour(),
        civil.minute()
    )
}

/// A resolved instant in the listing style.
pub fn format_instant(instant: &ParsedInstant) -> String {
    format_civil(instant.civil())
}

/// Truncates to `max_len` characters, the last three being `...`.
pub fn ellipsis(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_len {
        return Cow::Borrowed(s);
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    Cow::Owned(format!("{}...", kept.trim_end()))
}
