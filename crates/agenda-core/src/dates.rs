//! Spanish natural-language date resolution.
//!
//! [`DateTimeResolver::resolve`] turns fragments such as `"hoy a las 18:00"`,
//! `"mañana 9am"` or `"15 de marzo del 2025 a las 10:30"` into a
//! [`ParsedInstant`] at the configured civil offset. Three branches are tried
//! in order:
//!
//! 1. **Relative**: the text mentions `hoy` or `mañana`.
//! 2. **Explicit**: `D [de] MES [de|del] [YYYY]`, with the time of day taken
//!    from whatever text surrounds the date.
//! 3. **Fallback**: ISO-like machine formats (RFC 3339, `YYYY-MM-DD HH:MM`,
//!    bare `YYYY-MM-DD`).
//!
//! An explicit date without a year that already lies in the past (and is not
//! today) is moved to the next year.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use thiserror::Error;
use tracing::trace;

use crate::civil::{CivilOffset, ParsedInstant};

/// Spanish month names, January first.
pub const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Hour used when a date has no time of day.
pub const DEFAULT_HOUR: u32 = 9;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Errors raised while resolving a date fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("empty date text")]
    Empty,

    #[error("unknown month name: {0}")]
    UnknownMonth(String),

    #[error("invalid time of day: {hour}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },

    #[error("date does not exist: {year}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },

    #[error("unrecognized date: {0}")]
    Unrecognized(String),
}

/// Result type for date resolution.
pub type DateResult<T> = Result<T, DateError>;

/// Morning or afternoon marker after a clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

/// A clock time found in free text, before range validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeToken {
    pub hour: u32,
    pub minute: u32,
    pub meridiem: Option<Meridiem>,
}

impl TimeToken {
    /// Applies the meridiem and validates the result as a 24-hour time.
    ///
    /// `pm` adds twelve to hours below twelve; `12am` is midnight.
    pub fn to_time(self) -> DateResult<NaiveTime> {
        let hour = match self.meridiem {
            Some(Meridiem::Pm) if self.hour < 12 => self.hour + 12,
            Some(Meridiem::Am) if self.hour == 12 => 0,
            _ => self.hour,
        };
        NaiveTime::from_hms_opt(hour, self.minute, 0).ok_or(DateError::InvalidTime {
            hour,
            minute: self.minute,
        })
    }
}

/// Finds the first clock time in `text`.
///
/// A clock time is a run of one or two digits, optionally followed by `:MM`
/// or `.MM` and by `am`/`pm` (dotted forms accepted). Longer digit runs such
/// as years are skipped.
pub fn find_time_token(text: &str) -> Option<TimeToken> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i - start > 2 {
            continue;
        }
        let hour = parse_digits(&bytes[start..i]);

        let mut minute = 0;
        let mut end = i;
        if let Some(&sep) = bytes.get(end)
            && (sep == b':' || sep == b'.')
            && is_two_digit_field(bytes, end + 1)
        {
            minute = parse_digits(&bytes[end + 1..end + 3]);
            end += 3;
        }

        let meridiem = parse_meridiem(&bytes[end..]);
        return Some(TimeToken {
            hour,
            minute,
            meridiem,
        });
    }
    None
}

fn parse_digits(digits: &[u8]) -> u32 {
    digits
        .iter()
        .fold(0, |acc, d| acc * 10 + u32::from(d - b'0'))
}

fn is_two_digit_field(bytes: &[u8], at: usize) -> bool {
    let first = bytes.get(at).is_some_and(u8::is_ascii_digit);
    let second = bytes.get(at + 1).is_some_and(u8::is_ascii_digit);
    let third = bytes.get(at + 2).is_some_and(u8::is_ascii_digit);
    first && second && !third
}

fn parse_meridiem(rest: &[u8]) -> Option<Meridiem> {
    let rest = rest.trim_ascii_start();
    let meridiem = match rest.first().map(u8::to_ascii_lowercase) {
        Some(b'a') => Meridiem::Am,
        Some(b'p') => Meridiem::Pm,
        _ => return None,
    };
    let mut idx = 1;
    if rest.get(idx) == Some(&b'.') {
        idx += 1;
    }
    if rest.get(idx).map(u8::to_ascii_lowercase) != Some(b'm') {
        return None;
    }
    idx += 1;
    if rest.get(idx) == Some(&b'.') {
        idx += 1;
    }
    // "9 amigos" is not a meridiem.
    match rest.get(idx) {
        Some(b) if b.is_ascii_alphanumeric() || *b >= 0x80 => None,
        _ => Some(meridiem),
    }
}

/// Resolves Spanish date fragments at a fixed civil offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeResolver {
    offset: CivilOffset,
}

impl DateTimeResolver {
    pub fn new(offset: CivilOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> CivilOffset {
        self.offset
    }

    /// Resolves `text` relative to `now`.
    pub fn resolve(&self, text: &str, now: DateTime<Utc>) -> DateResult<ParsedInstant> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DateError::Empty);
        }
        let lower = trimmed.to_lowercase();
        let now_civil = self.offset.to_civil(&now);

        let parsed = if let Some(result) = self.resolve_relative(&lower, now_civil) {
            trace!(text = %trimmed, "resolved as relative date");
            result?
        } else if let Some(result) = self.resolve_explicit(&lower, now_civil) {
            trace!(text = %trimmed, "resolved as explicit date");
            result?
        } else {
            trace!(text = %trimmed, "falling back to machine formats");
            self.resolve_fallback(trimmed)?
        };

        self.roll_forward(parsed, now_civil)
    }

    /// `hoy` / `mañana` with an optional clock time.
    ///
    /// Returns `None` when neither keyword is present.
    pub fn resolve_relative(
        &self,
        lower: &str,
        now_civil: NaiveDateTime,
    ) -> Option<DateResult<ParsedInstant>> {
        let is_tomorrow = lower.contains("mañana");
        let is_today = lower.contains("hoy");
        if !is_tomorrow && !is_today {
            return None;
        }

        let today = now_civil.date();
        let date = if is_tomorrow {
            today + Duration::days(1)
        } else {
            today
        };

        let civil = match find_time_token(lower) {
            Some(token) => match token.to_time() {
                Ok(time) => date.and_time(time),
                Err(err) => return Some(Err(err)),
            },
            None if is_today && !lower.chars().any(|c| c.is_ascii_digit()) => {
                // Next whole hour of the resolved day; 23:xx lands on the following midnight.
                let hour_start =
                    date.and_time(NaiveTime::from_hms_opt(now_civil.hour(), 0, 0).unwrap_or(NaiveTime::MIN));
                hour_start + Duration::hours(1)
            }
            None => date.and_time(default_time()),
        };

        Some(Ok(ParsedInstant::from_civil(civil, self.offset, false)))
    }

    /// `D [de] MES [de|del] [YYYY]` plus an optional clock time anywhere else in the text.
    ///
    /// Returns `None` when no day-and-month phrase is present. A phrase whose
    /// month word is not a Spanish month is an error, not a fallthrough; without
    /// the "de" joiner the word must already be a month name to count.
    pub fn resolve_explicit(
        &self,
        lower: &str,
        now_civil: NaiveDateTime,
    ) -> Option<DateResult<ParsedInstant>> {
        let tokens: Vec<&str> = lower
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .collect();

        let phrase = find_date_phrase(&tokens)?;

        let Some(month) = month_number(phrase.month_word) else {
            return Some(Err(DateError::UnknownMonth(phrase.month_word.to_string())));
        };
        let (year, explicit) = match phrase.year {
            Some(year) => (year, true),
            None => (chrono::Datelike::year(&now_civil), false),
        };

        let Some(date) = NaiveDate::from_ymd_opt(year, month, phrase.day) else {
            return Some(Err(DateError::InvalidDate {
                year,
                month,
                day: phrase.day,
            }));
        };

        let rest = tokens
            .iter()
            .enumerate()
            .filter(|(i, _)| !phrase.consumed.contains(i))
            .map(|(_, t)| *t)
            .collect::<Vec<_>>()
            .join(" ");

        let time = match find_time_token(&rest) {
            Some(token) => match token.to_time() {
                Ok(time) => time,
                Err(err) => return Some(Err(err)),
            },
            None => default_time(),
        };

        Some(Ok(ParsedInstant::from_civil(
            date.and_time(time),
            self.offset,
            explicit,
        )))
    }

    /// Machine formats; every result counts as having an explicit year.
    pub fn resolve_fallback(&self, text: &str) -> DateResult<ParsedInstant> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            let civil = self.offset.to_civil(&dt);
            return Ok(ParsedInstant::from_civil(civil, self.offset, true));
        }
        for format in NAIVE_FORMATS {
            if let Ok(civil) = NaiveDateTime::parse_from_str(text, format) {
                return Ok(ParsedInstant::from_civil(civil, self.offset, true));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Ok(ParsedInstant::from_civil(
                date.and_time(default_time()),
                self.offset,
                true,
            ));
        }
        Err(DateError::Unrecognized(text.to_string()))
    }

    fn roll_forward(&self, parsed: ParsedInstant, now_civil: NaiveDateTime) -> DateResult<ParsedInstant> {
        if parsed.year_was_explicit()
            || parsed.civil() >= now_civil
            || parsed.date() == now_civil.date()
        {
            return Ok(parsed);
        }
        let next_year = parsed.year() + 1;
        trace!(from = parsed.year(), to = next_year, "rolling past date forward");
        parsed.with_year(next_year).ok_or(DateError::InvalidDate {
            year: next_year,
            month: parsed.month(),
            day: parsed.day(),
        })
    }
}

fn default_time() -> NaiveTime {
    NaiveTime::from_hms_opt(DEFAULT_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// 1-based month number for a Spanish month name.
pub fn month_number(word: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == word)
        .map(|idx| idx as u32 + 1)
}

struct DatePhrase<'a> {
    day: u32,
    month_word: &'a str,
    year: Option<i32>,
    consumed: Vec<usize>,
}

fn is_digits(token: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&token.len()) && token.bytes().all(|b| b.is_ascii_digit())
}

fn find_date_phrase<'a>(tokens: &[&'a str]) -> Option<DatePhrase<'a>> {
    for (i, token) in tokens.iter().enumerate() {
        if !is_digits(token, 1, 2) {
            continue;
        }
        let mut consumed = vec![i];
        let mut idx = i + 1;
        let joined = tokens.get(idx) == Some(&"de");
        if joined {
            consumed.push(idx);
            idx += 1;
        }
        let Some(month_word) = tokens.get(idx).map(|w| w.trim_end_matches('.')) else {
            continue;
        };
        if month_word.is_empty() || !month_word.chars().all(char::is_alphabetic) {
            continue;
        }
        // Without "de" only a real month name makes a date ("7 pm" is a time).
        if !joined && month_number(month_word).is_none() {
            continue;
        }
        consumed.push(idx);

        let mut year = None;
        let next = idx + 1;
        match tokens.get(next) {
            Some(&"de") | Some(&"del") => {
                if let Some(y) = tokens.get(next + 1).filter(|y| is_digits(y, 4, 4)) {
                    year = y.parse().ok();
                    consumed.extend([next, next + 1]);
                }
            }
            Some(y) if is_digits(y, 4, 4) => {
                year = y.parse().ok();
                consumed.push(next);
            }
            _ => {}
        }

        return Some(DatePhrase {
            day: parse_digits(token.as_bytes()),
            month_word,
            year,
            consumed,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn resolver() -> DateTimeResolver {
        DateTimeResolver::default()
    }

    /// A UTC instant given as civil time at -06:00.
    fn now_mx(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap() + Duration::hours(6)
    }

    fn resolve(text: &str, now: DateTime<Utc>) -> String {
        resolver().resolve(text, now).unwrap().render()
    }

    mod time_tokens {
        use super::*;

        fn time(text: &str) -> NaiveTime {
            find_time_token(text).unwrap().to_time().unwrap()
        }

        #[test]
        fn colon_and_dot_separators() {
            assert_eq!(time("a las 18:00"), NaiveTime::from_hms_opt(18, 0, 0).unwrap());
            assert_eq!(time("a las 7.45"), NaiveTime::from_hms_opt(7, 45, 0).unwrap());
        }

        #[test]
        fn meridiem_forms() {
            assert_eq!(time("9am"), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
            assert_eq!(time("3 pm"), NaiveTime::from_hms_opt(15, 0, 0).unwrap());
            assert_eq!(time("3:30 p.m."), NaiveTime::from_hms_opt(15, 30, 0).unwrap());
            assert_eq!(time("12 am"), NaiveTime::MIN);
            assert_eq!(time("12pm"), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        }

        #[test]
        fn word_starting_with_am_is_not_meridiem() {
            let token = find_time_token("9 amigos").unwrap();
            assert_eq!(token.meridiem, None);
        }

        #[test]
        fn skips_long_digit_runs() {
            let token = find_time_token("del 2025 a las 10:30").unwrap();
            assert_eq!((token.hour, token.minute), (10, 30));
            assert!(find_time_token("2025").is_none());
        }

        #[test]
        fn out_of_range_is_invalid() {
            let err = find_time_token("25:00").unwrap().to_time().unwrap_err();
            assert_eq!(err, DateError::InvalidTime { hour: 25, minute: 0 });
            let token = find_time_token("10:75").unwrap();
            assert!(token.to_time().is_err());
        }
    }

    mod relative {
        use super::*;

        #[test]
        fn today_with_time() {
            let now = now_mx(2024, 6, 1, 10, 0);
            assert_eq!(resolve("hoy a las 18:00", now), "2024-06-01T18:00:00-06:00");
        }

        #[test]
        fn tomorrow_with_meridiem() {
            let now = now_mx(2024, 6, 1, 10, 0);
            assert_eq!(resolve("mañana 9am", now), "2024-06-02T09:00:00-06:00");
            assert_eq!(resolve("Mañana a las 4 pm", now), "2024-06-02T16:00:00-06:00");
        }

        #[test]
        fn today_without_time_is_next_hour() {
            let now = now_mx(2024, 6, 1, 10, 42);
            assert_eq!(resolve("hoy", now), "2024-06-01T11:00:00-06:00");
        }

        #[test]
        fn today_late_night_rolls_to_next_day() {
            let now = now_mx(2024, 6, 1, 23, 15);
            assert_eq!(resolve("hoy", now), "2024-06-02T00:00:00-06:00");
        }

        #[test]
        fn tomorrow_wins_over_today() {
            let now = now_mx(2024, 6, 1, 10, 42);
            assert_eq!(resolve("hoy en la mañana", now), "2024-06-02T11:00:00-06:00");
            assert_eq!(resolve("hoy en la mañana a las 9", now), "2024-06-02T09:00:00-06:00");
        }

        #[test]
        fn tomorrow_without_time_is_nine() {
            let now = now_mx(2024, 6, 1, 10, 0);
            assert_eq!(resolve("mañana", now), "2024-06-02T09:00:00-06:00");
        }

        #[test]
        fn today_in_the_past_is_not_rolled() {
            let now = now_mx(2024, 6, 1, 20, 0);
            assert_eq!(resolve("hoy a las 8:00", now), "2024-06-01T08:00:00-06:00");
        }

        #[test]
        fn invalid_clock_is_an_error() {
            let now = now_mx(2024, 6, 1, 10, 0);
            let err = resolver().resolve("hoy a las 25:00", now).unwrap_err();
            assert!(matches!(err, DateError::InvalidTime { hour: 25, .. }));
        }

        #[test]
        fn uses_civil_day_not_utc_day() {
            // 03:00 UTC on the 2nd is 21:00 on the 1st at -06:00.
            let now = Utc.with_ymd_and_hms(2024, 6, 2, 3, 0, 0).unwrap();
            assert_eq!(resolve("hoy a las 22:00", now), "2024-06-01T22:00:00-06:00");
        }
    }

    mod explicit {
        use super::*;

        #[test]
        fn day_month_year_and_time() {
            let now = now_mx(2024, 6, 1, 10, 0);
            assert_eq!(
                resolve("15 de marzo del 2025 a las 10:30", now),
                "2025-03-15T10:30:00-06:00"
            );
        }

        #[test]
        fn past_date_without_year_rolls_forward() {
            let now = now_mx(2024, 6, 1, 10, 0);
            assert_eq!(resolve("4 de enero 18:00", now), "2025-01-04T18:00:00-06:00");
        }

        #[test]
        fn future_date_without_year_stays() {
            let now = now_mx(2024, 6, 1, 10, 0);
            assert_eq!(resolve("4 diciembre 18:00", now), "2024-12-04T18:00:00-06:00");
        }

        #[test]
        fn same_day_earlier_hour_is_not_rolled() {
            let now = now_mx(2024, 6, 1, 10, 0);
            assert_eq!(resolve("1 de junio 8:00", now), "2024-06-01T08:00:00-06:00");
        }

        #[test]
        fn past_date_with_year_is_kept() {
            let now = now_mx(2024, 6, 1, 10, 0);
            assert_eq!(resolve("4 de enero de 2024", now), "2024-01-04T09:00:00-06:00");
        }

        #[test]
        fn time_before_date() {
            let now = now_mx(2024, 6, 1, 10, 0);
            assert_eq!(resolve("a las 7pm el 20 de julio", now), "2024-07-20T19:00:00-06:00");
        }

        #[test]
        fn spaced_meridiem_before_date() {
            let now = now_mx(2024, 6, 1, 10, 42);
            assert_eq!(
                resolve("a las 7 pm el 20 de julio", now),
                "2024-07-20T19:00:00-06:00"
            );
        }

        #[test]
        fn number_and_word_without_de_is_not_a_date() {
            let now = now_mx(2024, 6, 1, 10, 0);
            let err = resolver().resolve("7 pm el jueves", now).unwrap_err();
            assert!(matches!(err, DateError::Unrecognized(_)));
        }

        #[test]
        fn unknown_month_fails_without_fallback() {
            let now = now_mx(2024, 6, 1, 10, 0);
            let err = resolver().resolve("15 de marzzo", now).unwrap_err();
            assert_eq!(err, DateError::UnknownMonth("marzzo".to_string()));
        }

        #[test]
        fn impossible_day_fails() {
            let now = now_mx(2024, 6, 1, 10, 0);
            let err = resolver().resolve("31 de abril", now).unwrap_err();
            assert!(matches!(err, DateError::InvalidDate { month: 4, day: 31, .. }));
        }

        #[test]
        fn leap_day_roll_forward_into_common_year_fails() {
            let now = now_mx(2024, 3, 15, 10, 0);
            let err = resolver().resolve("29 de febrero", now).unwrap_err();
            assert_eq!(
                err,
                DateError::InvalidDate {
                    year: 2025,
                    month: 2,
                    day: 29
                }
            );
        }
    }

    mod fallback {
        use super::*;

        #[test]
        fn rfc3339_converted_to_offset() {
            let now = now_mx(2024, 6, 1, 10, 0);
            assert_eq!(
                resolve("2024-06-02T00:00:00Z", now),
                "2024-06-01T18:00:00-06:00"
            );
        }

        #[test]
        fn naive_datetime_taken_as_civil() {
            let now = now_mx(2024, 6, 1, 10, 0);
            assert_eq!(resolve("2024-06-03 14:30", now), "2024-06-03T14:30:00-06:00");
        }

        #[test]
        fn past_machine_dates_are_not_rolled() {
            let now = now_mx(2024, 6, 1, 10, 0);
            assert_eq!(resolve("2023-01-01", now), "2023-01-01T09:00:00-06:00");
        }

        #[test]
        fn garbage_is_unrecognized() {
            let now = now_mx(2024, 6, 1, 10, 0);
            let err = resolver().resolve("el próximo jueves", now).unwrap_err();
            assert!(matches!(err, DateError::Unrecognized(_)));
            assert_eq!(resolver().resolve("   ", now).unwrap_err(), DateError::Empty);
        }
    }

    #[test]
    fn rendering_is_idempotent() {
        let now = now_mx(2024, 6, 1, 10, 0);
        for text in [
            "hoy a las 18:00",
            "mañana",
            "15 de marzo del 2025 a las 10:30",
            "4 de enero",
            "2024-07-01T12:00:00-06:00",
        ] {
            let first = resolver().resolve(text, now).unwrap();
            let again = resolver().resolve(&first.render(), now).unwrap();
            assert!(first.same_instant(&again), "not idempotent for {text}");
        }
    }

    #[test]
    fn results_never_precede_today_without_explicit_year() {
        let now = now_mx(2024, 6, 1, 10, 0);
        for month in MONTHS {
            let text = format!("10 de {month}");
            let parsed = resolver().resolve(&text, now).unwrap();
            let now_civil = resolver().offset().to_civil(&now);
            assert!(parsed.civil() >= now_civil || parsed.date() == now_civil.date());
        }
    }
}
