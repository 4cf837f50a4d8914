//! Civil time at a fixed UTC offset.
//!
//! Every timestamp the bot produces is expressed at one constant offset with
//! no daylight-saving transitions. [`CivilOffset`] holds that offset,
//! [`ParsedInstant`] is a resolved wall-clock minute at it, [`TimeWindow`]
//! bounds a calendar query and [`EventTime`] is an event boundary as reported
//! by the calendar provider.

use std::cmp::Ordering;
use std::fmt;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime,
    Offset, SecondsFormat, Timelike, Utc,
};
use serde::{Deserialize, Serialize};

/// Offset used when nothing else is configured: UTC−06:00.
pub const DEFAULT_OFFSET_MINUTES: i32 = -6 * 60;

const MINUTES_PER_DAY: i32 = 24 * 60;

/// A constant UTC offset, in minutes east of UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct CivilOffset {
    minutes: i32,
}

impl CivilOffset {
    /// Creates an offset, rejecting anything a full day or more away from UTC.
    pub fn new(minutes: i32) -> Option<Self> {
        (minutes.abs() < MINUTES_PER_DAY).then_some(Self { minutes })
    }

    /// Minutes east of UTC.
    pub fn minutes(&self) -> i32 {
        self.minutes
    }

    /// The offset as a chrono [`FixedOffset`].
    pub fn fixed(&self) -> FixedOffset {
        // `new` keeps the value strictly inside one day, which FixedOffset accepts.
        FixedOffset::east_opt(self.minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Wall-clock time at this offset for the given instant.
    pub fn to_civil<Tz: chrono::TimeZone>(&self, instant: &DateTime<Tz>) -> NaiveDateTime {
        instant.naive_utc() + Duration::minutes(i64::from(self.minutes))
    }

    /// Attaches this offset to a wall-clock time.
    pub fn localize(&self, civil: NaiveDateTime) -> DateTime<FixedOffset> {
        let utc = civil - Duration::minutes(i64::from(self.minutes));
        DateTime::<Utc>::from_naive_utc_and_offset(utc, Utc).with_timezone(&self.fixed())
    }

    /// Renders the offset as `±HH:MM`.
    pub fn render(&self) -> String {
        let sign = if self.minutes < 0 { '-' } else { '+' };
        let abs = self.minutes.abs();
        format!("{}{:02}:{:02}", sign, abs / 60, abs % 60)
    }
}

impl Default for CivilOffset {
    fn default() -> Self {
        Self {
            minutes: DEFAULT_OFFSET_MINUTES,
        }
    }
}

impl TryFrom<i32> for CivilOffset {
    type Error = String;

    fn try_from(minutes: i32) -> Result<Self, Self::Error> {
        Self::new(minutes).ok_or_else(|| format!("offset out of range: {} minutes", minutes))
    }
}

impl From<CivilOffset> for i32 {
    fn from(offset: CivilOffset) -> Self {
        offset.minutes
    }
}

impl fmt::Display for CivilOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// A resolved wall-clock minute at a fixed offset.
///
/// Always renders as `YYYY-MM-DDTHH:MM:SS±HH:MM` with zero seconds. The
/// `year_was_explicit` flag records whether the user typed the year; it
/// drives the roll-forward rule of the date resolver and is otherwise inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedInstant {
    civil: NaiveDateTime,
    offset: CivilOffset,
    year_was_explicit: bool,
}

impl ParsedInstant {
    /// Builds an instant from a wall-clock time; seconds are dropped.
    pub fn from_civil(civil: NaiveDateTime, offset: CivilOffset, year_was_explicit: bool) -> Self {
        let civil = civil.with_nanosecond(0).unwrap_or(civil);
        let civil = civil.with_second(0).unwrap_or(civil);
        Self {
            civil,
            offset,
            year_was_explicit,
        }
    }

    /// Builds an instant from calendar fields, or `None` if they do not name a real minute.
    pub fn from_fields(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        offset: CivilOffset,
        year_was_explicit: bool,
    ) -> Option<Self> {
        let civil = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
        Some(Self::from_civil(civil, offset, year_was_explicit))
    }

    pub fn year(&self) -> i32 {
        self.civil.year()
    }

    pub fn month(&self) -> u32 {
        self.civil.month()
    }

    pub fn day(&self) -> u32 {
        self.civil.day()
    }

    pub fn hour(&self) -> u32 {
        self.civil.hour()
    }

    pub fn minute(&self) -> u32 {
        self.civil.minute()
    }

    pub fn offset(&self) -> CivilOffset {
        self.offset
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset.minutes()
    }

    pub fn year_was_explicit(&self) -> bool {
        self.year_was_explicit
    }

    /// The wall-clock date and time.
    pub fn civil(&self) -> NaiveDateTime {
        self.civil
    }

    /// The calendar day at the instant's offset.
    pub fn date(&self) -> NaiveDate {
        self.civil.date()
    }

    /// The same wall-clock minute in another year, if that date exists.
    pub fn with_year(&self, year: i32) -> Option<Self> {
        let civil = self.civil.with_year(year)?;
        Some(Self { civil, ..*self })
    }

    /// Canonical `YYYY-MM-DDTHH:MM:SS±HH:MM` rendering.
    pub fn render(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:00{}",
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.offset.render()
        )
    }

    /// The instant as a chrono datetime carrying the fixed offset.
    pub fn to_datetime(&self) -> DateTime<FixedOffset> {
        self.offset.localize(self.civil)
    }

    /// Adds sixty minutes of wall-clock time.
    ///
    /// 23:30 becomes 00:30 of the next calendar day; the offset never changes.
    pub fn add_one_hour_safe(&self) -> Self {
        Self {
            civil: self.civil + Duration::hours(1),
            ..*self
        }
    }

    /// 00:00:00 of the instant's civil day.
    pub fn start_of_day(&self) -> DateTime<FixedOffset> {
        start_of_day(self.date(), self.offset)
    }

    /// 23:59:59 of the instant's civil day.
    pub fn end_of_day(&self) -> DateTime<FixedOffset> {
        end_of_day(self.date(), self.offset)
    }

    /// Orders two instants by the moment they denote, ignoring the explicit-year flag.
    pub fn cmp_instant(&self, other: &Self) -> Ordering {
        self.to_datetime().cmp(&other.to_datetime())
    }

    /// Returns `true` if both denote the same moment.
    pub fn same_instant(&self, other: &Self) -> bool {
        self.cmp_instant(other) == Ordering::Equal
    }
}

impl fmt::Display for ParsedInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// 00:00:00 of a civil day.
pub fn start_of_day(date: NaiveDate, offset: CivilOffset) -> DateTime<FixedOffset> {
    offset.localize(date.and_time(NaiveTime::MIN))
}

/// 23:59:59 of a civil day.
pub fn end_of_day(date: NaiveDate, offset: CivilOffset) -> DateTime<FixedOffset> {
    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    offset.localize(date.and_time(last_second))
}

/// Shifts a datetime by whole calendar months, clamping the day to the month's end.
///
/// Saturates at the input when the result would leave chrono's range.
pub fn shift_months(dt: DateTime<FixedOffset>, months: i32) -> DateTime<FixedOffset> {
    let magnitude = Months::new(months.unsigned_abs());
    let shifted = if months >= 0 {
        dt.checked_add_months(magnitude)
    } else {
        dt.checked_sub_months(magnitude)
    };
    shifted.unwrap_or(dt)
}

/// Renders a datetime as `YYYY-MM-DDTHH:MM:SS±HH:MM`.
pub fn render_datetime(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// A closed range `[start, end]` for listing calendar events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Lower bound (`timeMin`).
    pub start: DateTime<FixedOffset>,
    /// Upper bound (`timeMax`).
    pub end: DateTime<FixedOffset>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// A window reaching `before` months back and `after` months ahead of `now`.
    ///
    /// A side that would leave the representable range stays at `now`.
    pub fn span(now: DateTime<FixedOffset>, before: u32, after: u32) -> Self {
        Self::new(
            now.checked_sub_months(Months::new(before)).unwrap_or(now),
            now.checked_add_months(Months::new(after)).unwrap_or(now),
        )
    }

    /// A window of `radius` on each side of `center`.
    pub fn around(center: DateTime<FixedOffset>, radius: Duration) -> Self {
        let radius = radius.abs();
        Self::new(center - radius, center + radius)
    }

    /// The whole civil day of `date`, 00:00:00 to 23:59:59.
    pub fn whole_day(date: NaiveDate, offset: CivilOffset) -> Self {
        Self::new(start_of_day(date, offset), end_of_day(date, offset))
    }

    /// From `now` until 23:59:59 of the civil day containing `until`.
    pub fn until_end_of_day(now: DateTime<FixedOffset>, until: NaiveDate, offset: CivilOffset) -> Self {
        let end = end_of_day(until, offset).max(now);
        Self::new(now, end)
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within this window, both ends inclusive.
    pub fn contains<Tz: chrono::TimeZone>(&self, dt: &DateTime<Tz>) -> bool {
        let dt = dt.with_timezone(&Utc);
        self.start <= dt && dt <= self.end
    }

    /// `timeMin` as sent to the calendar provider.
    pub fn time_min(&self) -> String {
        render_datetime(&self.start)
    }

    /// `timeMax` as sent to the calendar provider.
    pub fn time_max(&self) -> String {
        render_datetime(&self.end)
    }
}

/// Start or end of a calendar event as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific moment.
    DateTime(DateTime<FixedOffset>),
    /// An all-day event date.
    AllDay(NaiveDate),
}

impl EventTime {
    pub fn from_datetime(dt: DateTime<FixedOffset>) -> Self {
        Self::DateTime(dt)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Wall-clock time at `offset`, or `None` for all-day events.
    pub fn civil(&self, offset: CivilOffset) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(offset.to_civil(dt)),
            Self::AllDay(_) => None,
        }
    }

    /// The calendar day at `offset`.
    pub fn date(&self, offset: CivilOffset) -> NaiveDate {
        match self {
            Self::DateTime(dt) => offset.to_civil(dt).date(),
            Self::AllDay(date) => *date,
        }
    }

    /// Comparable UTC moment; all-day events count from midnight UTC.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => dt.with_timezone(&Utc),
            Self::AllDay(date) => date.and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mx() -> CivilOffset {
        CivilOffset::default()
    }

    fn instant(y: i32, m: u32, d: u32, h: u32, min: u32) -> ParsedInstant {
        ParsedInstant::from_fields(y, m, d, h, min, mx(), false).unwrap()
    }

    mod offset {
        use super::*;

        #[test]
        fn renders_sign_and_padding() {
            assert_eq!(CivilOffset::default().render(), "-06:00");
            assert_eq!(CivilOffset::new(0).unwrap().render(), "+00:00");
            assert_eq!(CivilOffset::new(330).unwrap().render(), "+05:30");
            assert_eq!(CivilOffset::new(-570).unwrap().render(), "-09:30");
        }

        #[test]
        fn rejects_a_full_day() {
            assert!(CivilOffset::new(24 * 60).is_none());
            assert!(CivilOffset::new(-24 * 60).is_none());
            assert!(CivilOffset::new(23 * 60 + 59).is_some());
        }

        #[test]
        fn civil_round_trip() {
            let now = Utc.with_ymd_and_hms(2024, 6, 1, 16, 0, 0).unwrap();
            let civil = mx().to_civil(&now);
            assert_eq!(civil.hour(), 10);
            assert_eq!(mx().localize(civil), now);
        }

        #[test]
        fn deserializes_with_validation() {
            let ok: CivilOffset = serde_json::from_str("-300").unwrap();
            assert_eq!(ok.minutes(), -300);
            assert!(serde_json::from_str::<CivilOffset>("2000").is_err());
        }
    }

    mod parsed_instant {
        use super::*;

        #[test]
        fn renders_canonically() {
            assert_eq!(instant(2024, 6, 1, 18, 0).render(), "2024-06-01T18:00:00-06:00");
            assert_eq!(instant(2025, 1, 9, 7, 5).to_string(), "2025-01-09T07:05:00-06:00");
        }

        #[test]
        fn rejects_impossible_fields() {
            assert!(ParsedInstant::from_fields(2025, 2, 29, 9, 0, mx(), true).is_none());
            assert!(ParsedInstant::from_fields(2024, 6, 1, 24, 0, mx(), true).is_none());
            assert!(ParsedInstant::from_fields(2024, 6, 1, 9, 60, mx(), true).is_none());
        }

        #[test]
        fn add_one_hour_is_wall_clock() {
            let later = instant(2024, 6, 1, 18, 0).add_one_hour_safe();
            assert_eq!(later.render(), "2024-06-01T19:00:00-06:00");
        }

        #[test]
        fn add_one_hour_crosses_midnight() {
            let late = instant(2024, 12, 31, 23, 30).add_one_hour_safe();
            assert_eq!(late.render(), "2025-01-01T00:30:00-06:00");
            assert_eq!(late.offset_minutes(), -360);
        }

        #[test]
        fn add_one_hour_hour_is_successor_mod_24() {
            for hour in 0..24 {
                let start = instant(2024, 3, 10, hour, 15);
                let next = start.add_one_hour_safe();
                assert_eq!(next.hour(), (hour + 1) % 24);
                assert_eq!(next.offset(), start.offset());
                if hour == 23 {
                    assert_eq!(next.date(), start.date().succ_opt().unwrap());
                } else {
                    assert_eq!(next.date(), start.date());
                }
            }
        }

        #[test]
        fn day_bounds() {
            let i = instant(2024, 6, 1, 18, 0);
            assert_eq!(render_datetime(&i.start_of_day()), "2024-06-01T00:00:00-06:00");
            assert_eq!(render_datetime(&i.end_of_day()), "2024-06-01T23:59:59-06:00");
        }

        #[test]
        fn with_year_rejects_missing_leap_day() {
            let leap = instant(2024, 2, 29, 9, 0);
            assert!(leap.with_year(2025).is_none());
            assert_eq!(leap.with_year(2028).unwrap().year(), 2028);
        }

        #[test]
        fn instant_comparison_ignores_flag() {
            let a = ParsedInstant::from_fields(2024, 6, 1, 18, 0, mx(), true).unwrap();
            let b = ParsedInstant::from_fields(2024, 6, 1, 18, 0, mx(), false).unwrap();
            assert_ne!(a, b);
            assert!(a.same_instant(&b));
        }
    }

    mod time_window {
        use super::*;

        #[test]
        fn span_clamps_day() {
            let now = mx().localize(
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap().and_hms_opt(10, 0, 0).unwrap(),
            );
            let window = TimeWindow::span(now, 12, 1);
            assert_eq!(window.time_min(), "2023-01-31T10:00:00-06:00");
            assert_eq!(window.time_max(), "2024-02-29T10:00:00-06:00");
        }

        #[test]
        fn span_out_of_range_stays_at_now() {
            let now = instant(2024, 6, 10, 12, 0).to_datetime();
            let window = TimeWindow::span(now, u32::MAX, u32::MAX);
            assert_eq!(window.start, now);
            assert_eq!(window.end, now);

            let window = TimeWindow::span(now, 0, 3);
            assert_eq!(window.time_max(), "2024-09-10T12:00:00-06:00");
        }

        #[test]
        fn around_is_symmetric() {
            let center = instant(2024, 6, 10, 12, 0).to_datetime();
            let window = TimeWindow::around(center, Duration::days(7));
            assert_eq!(window.time_min(), "2024-06-03T12:00:00-06:00");
            assert_eq!(window.time_max(), "2024-06-17T12:00:00-06:00");
            assert_eq!(window.duration(), Duration::days(14));
        }

        #[test]
        fn whole_day_bounds() {
            let window = TimeWindow::whole_day(NaiveDate::from_ymd_opt(2024, 12, 4).unwrap(), mx());
            assert_eq!(window.time_min(), "2024-12-04T00:00:00-06:00");
            assert_eq!(window.time_max(), "2024-12-04T23:59:59-06:00");
        }

        #[test]
        fn contains_is_inclusive() {
            let window = TimeWindow::whole_day(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), mx());
            assert!(window.contains(&window.start));
            assert!(window.contains(&window.end));
            assert!(!window.contains(&(window.end + Duration::seconds(1))));
        }

        #[test]
        #[should_panic(expected = "start must be <= end")]
        fn inverted_window_panics() {
            let t = instant(2024, 6, 1, 10, 0).to_datetime();
            TimeWindow::new(t, t - Duration::minutes(1));
        }
    }

    mod event_time {
        use super::*;

        #[test]
        fn all_day_orders_from_midnight_utc() {
            let all_day = EventTime::from_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
            let timed = EventTime::from_datetime(instant(2024, 6, 1, 9, 0).to_datetime());
            assert!(all_day < timed);
            assert!(all_day.is_all_day());
            assert!(all_day.civil(mx()).is_none());
        }

        #[test]
        fn date_uses_offset() {
            // 02:00 UTC on the 2nd is still the 1st at -06:00.
            let dt = Utc.with_ymd_and_hms(2024, 6, 2, 2, 0, 0).unwrap().fixed_offset();
            let et = EventTime::from_datetime(dt);
            assert_eq!(et.date(mx()), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        }

        #[test]
        fn serde_roundtrip() {
            let et = EventTime::from_datetime(instant(2024, 6, 1, 9, 0).to_datetime());
            let json = serde_json::to_string(&et).unwrap();
            let parsed: EventTime = serde_json::from_str(&json).unwrap();
            assert_eq!(et, parsed);
        }
    }
}
