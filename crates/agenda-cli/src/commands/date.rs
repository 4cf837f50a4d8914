//! Date command: shows how a Spanish date expression resolves.

use chrono::{DateTime, Utc};
use serde_json::json;

use agenda_core::format::format_instant;
use agenda_core::{CivilOffset, DateTimeResolver, ParsedInstant};

use crate::error::CliResult;

pub fn resolve(offset: CivilOffset, text: &str, now: DateTime<Utc>) -> CliResult<ParsedInstant> {
    Ok(DateTimeResolver::new(offset).resolve(text, now)?)
}

pub fn render(instant: &ParsedInstant, json: bool) -> String {
    if json {
        json!({
            "instant": instant.render(),
            "display": format_instant(instant),
            "year_was_explicit": instant.year_was_explicit(),
        })
        .to_string()
    } else {
        format!("{}  ({} hrs)", instant.render(), format_instant(instant))
    }
}

pub fn run(offset: CivilOffset, text: &str, now: DateTime<Utc>, json: bool) -> CliResult<()> {
    let instant = resolve(offset, text, now)?;
    println!("{}", render(&instant, json));
    Ok(())
}
