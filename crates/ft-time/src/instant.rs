//! Absolute instants: flexible parsing, calendar arithmetic, mask formatting.
//!
//! An [`Instant`] wraps a single millisecond-epoch value. Construction is
//! permissive: unparseable input yields an invalid instant (queryable via
//! [`Instant::is_valid`]) rather than an error, so display code never has to
//! unwrap. Calendar arithmetic runs on UTC fields, which keeps
//! year/month/day shifts stable across daylight-saving transitions in the
//! local zone.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{
    DateTime, Datelike, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Timelike, Utc,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duration::Duration;
use crate::token;

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_DAY: i64 = 86_400_000;

/// Fixed English month names. Locale support is out of scope.
const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Fixed English weekday names, Sunday first.
const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Calendar formatting tokens. Substitution is longest-token-first.
const CALENDAR_TOKENS: &[&str] = &[
    "YYYY", "YY", "MMMM", "MMM", "MM", "M", "DD", "D", "dddd", "ddd", "HH", "H", "hh", "h", "A",
    "a", "mm", "m", "ss", "s", "SSS", "SS", "S", "Z", "ZZ", "ms", "MS",
];

static CALENDAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&token::alternation(CALENDAR_TOKENS)).unwrap());

/// Explicit time-zone markers: `Z`, `+HH:MM`, or `+HHMM` (either sign).
static TZ_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[Zz]|[+-]\d{2}:?\d{2})$").unwrap());

/// Database-shaped timestamps: a date, a space, then a time.
static DATE_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2} ").unwrap());

/// Offset-carrying formats outside RFC 3339 (colon-less offsets,
/// minute-precision times).
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"];

/// Options for string parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Interpret naive timestamps (no zone marker) as UTC wall-clock time
    /// instead of local time. The backend emits naive timestamps that are
    /// intended to be UTC.
    pub assume_utc: bool,
}

/// A calendar-unit delta for [`Instant::add`] and [`Instant::subtract`].
///
/// Year and month components shift calendar fields (clipping the
/// day-of-month to the target month's length); the remaining components are
/// exact fixed-width spans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarDelta {
    pub years: i32,
    pub months: i32,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub milliseconds: i64,
}

impl CalendarDelta {
    /// The delta with every component negated.
    #[must_use]
    pub const fn negated(&self) -> Self {
        Self {
            years: -self.years,
            months: -self.months,
            days: -self.days,
            hours: -self.hours,
            minutes: -self.minutes,
            seconds: -self.seconds,
            milliseconds: -self.milliseconds,
        }
    }
}

/// Fixed-width units for [`Instant::diff`].
///
/// Divisors are not calendar-aware: a day is always exactly 86,400,000 ms
/// regardless of daylight-saving transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl DiffUnit {
    #[must_use]
    pub const fn divisor_ms(&self) -> i64 {
        match self {
            Self::Milliseconds => 1,
            Self::Seconds => MS_PER_SECOND,
            Self::Minutes => MS_PER_MINUTE,
            Self::Hours => MS_PER_HOUR,
            Self::Days => MS_PER_DAY,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
            Self::Days => "d",
        }
    }
}

impl fmt::Display for DiffUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized [`DiffUnit`] name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown diff unit: {0}")]
pub struct UnknownUnit(pub String);

impl FromStr for DiffUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ms" => Ok(Self::Milliseconds),
            "s" => Ok(Self::Seconds),
            "m" => Ok(Self::Minutes),
            "h" => Ok(Self::Hours),
            "d" => Ok(Self::Days),
            _ => Err(UnknownUnit(s.to_string())),
        }
    }
}

/// An immutable absolute point in time, backed by a millisecond-epoch value.
///
/// Invalid is a first-class state: constructing from unparseable input
/// yields an instant for which [`is_valid`](Self::is_valid) is `false`,
/// never an error. An invalid `Instant` is not the same thing as
/// `Option::<Instant>::None`; the two mean different things at the REST
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instant {
    epoch_ms: Option<i64>,
}

impl Instant {
    /// The current instant.
    #[must_use]
    pub fn now() -> Self {
        Self {
            epoch_ms: Some(Utc::now().timestamp_millis()),
        }
    }

    /// The invalid instant.
    #[must_use]
    pub const fn invalid() -> Self {
        Self { epoch_ms: None }
    }

    /// Construct from a millisecond-epoch value.
    ///
    /// Values outside chrono's representable range yield an invalid instant.
    #[must_use]
    pub fn from_epoch_ms(ms: i64) -> Self {
        Self {
            epoch_ms: DateTime::from_timestamp_millis(ms).map(|_| ms),
        }
    }

    /// Construct from a second-epoch value.
    #[must_use]
    pub fn from_epoch_secs(secs: i64) -> Self {
        match secs.checked_mul(MS_PER_SECOND) {
            Some(ms) => Self::from_epoch_ms(ms),
            None => Self::invalid(),
        }
    }

    /// Parse a timestamp string with default options (naive timestamps are
    /// local time).
    #[must_use]
    pub fn parse(input: &str) -> Self {
        Self::parse_with(input, ParseOptions::default())
    }

    /// Parse a timestamp string.
    ///
    /// Accepted shapes, tried in order:
    /// 1. `YYYY-MM-DD HH:MM:SS` database timestamps (the space is normalized
    ///    to `T` first)
    /// 2. Offset-carrying forms: trailing `Z`, `+HH:MM`, or `+HHMM`
    /// 3. Naive date-times and bare dates, resolved against the local zone,
    ///    or against UTC when `opts.assume_utc` is set
    ///
    /// Anything else yields an invalid instant.
    #[must_use]
    pub fn parse_with(input: &str, opts: ParseOptions) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::invalid();
        }
        let normalized = if !trimmed.contains('T') && DATE_SPACE_RE.is_match(trimmed) {
            trimmed.replacen(' ', "T", 1)
        } else {
            trimmed.to_string()
        };

        if TZ_MARKER_RE.is_match(&normalized) {
            if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
                return Self::from_epoch_ms(dt.timestamp_millis());
            }
            for format in OFFSET_FORMATS {
                if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
                    return Self::from_epoch_ms(dt.timestamp_millis());
                }
            }
            tracing::trace!(input, "unparseable instant input, yielding invalid instant");
            return Self::invalid();
        }

        match parse_naive(&normalized) {
            Some(naive) if opts.assume_utc => {
                Self::from_epoch_ms(Utc.from_utc_datetime(&naive).timestamp_millis())
            }
            Some(naive) => Self::from_epoch_ms(naive_local_to_utc(&naive).timestamp_millis()),
            None => {
                tracing::trace!(input, "unparseable instant input, yielding invalid instant");
                Self::invalid()
            }
        }
    }

    /// Whether this instant holds a real point in time.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.epoch_ms.is_some()
    }

    /// The raw millisecond-epoch value, `None` if invalid.
    #[must_use]
    pub const fn epoch_ms(&self) -> Option<i64> {
        self.epoch_ms
    }

    /// The chrono view of this instant, `None` if invalid.
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        self.epoch_ms.and_then(DateTime::from_timestamp_millis)
    }

    /// Canonical ISO-8601 serialization: millisecond precision, explicit `Z`.
    ///
    /// Parsing a canonical string and re-serializing it returns the
    /// identical string for any in-range instant. Returns `None` for an
    /// invalid instant.
    #[must_use]
    pub fn to_iso8601(&self) -> Option<String> {
        self.to_datetime()
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
    }

    /// Render this instant through a token mask using local-zone fields.
    ///
    /// Recognized tokens: `YYYY` `YY` `MMMM` `MMM` `MM` `M` `DD` `D` `dddd`
    /// `ddd` `HH` `H` `hh` `h` `A` `a` `mm` `m` `ss` `s` `SSS` `SS` `S` `Z`
    /// `ZZ` `ms` `MS`. Unmatched characters pass through verbatim, so
    /// literal text that spells a token is substituted too.
    ///
    /// An invalid instant renders the `NaN` sentinel into every token slot;
    /// check [`is_valid`](Self::is_valid) first if that is unacceptable.
    #[must_use]
    pub fn format(&self, mask: &str) -> String {
        self.format_fields(mask, false)
    }

    /// Render this instant through a token mask using UTC fields.
    #[must_use]
    pub fn format_utc(&self, mask: &str) -> String {
        self.format_fields(mask, true)
    }

    fn format_fields(&self, mask: &str, utc: bool) -> String {
        let Some(dt) = self.to_datetime() else {
            return token::substitute(&CALENDAR_RE, mask, |_| "NaN".to_string());
        };
        let fields = if utc {
            Fields::from_fixed(dt.fixed_offset())
        } else {
            Fields::from_fixed(dt.with_timezone(&Local).fixed_offset())
        };
        token::substitute(&CALENDAR_RE, mask, |tok| fields.render(tok))
    }

    /// Apply a calendar delta.
    ///
    /// Year and month components shift UTC calendar fields, clipping the
    /// day-of-month to the target month's length (Jan 31 + 1 month lands on
    /// the last day of February). Day and time components are then added as
    /// one combined span so rollovers across hour/day boundaries resolve
    /// correctly.
    ///
    /// Because of the clipping, adding a month/year delta and subtracting it
    /// again is not guaranteed to restore the original instant. Deltas with
    /// only day-and-smaller components invert exactly.
    #[must_use]
    pub fn add(&self, delta: &CalendarDelta) -> Self {
        let Some(dt) = self.to_datetime() else {
            return Self::invalid();
        };

        let months = i64::from(dt.year()) * 12
            + i64::from(dt.month0())
            + i64::from(delta.years) * 12
            + i64::from(delta.months);
        let Ok(year) = i32::try_from(months.div_euclid(12)) else {
            return Self::invalid();
        };
        let month = months.rem_euclid(12) as u32 + 1;
        let day = dt.day().min(days_in_month(year, month));
        let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
            return Self::invalid();
        };
        let shifted = Utc.from_utc_datetime(&date.and_time(dt.time()));

        let tail_ms = i128::from(delta.days) * i128::from(MS_PER_DAY)
            + i128::from(delta.hours) * i128::from(MS_PER_HOUR)
            + i128::from(delta.minutes) * i128::from(MS_PER_MINUTE)
            + i128::from(delta.seconds) * i128::from(MS_PER_SECOND)
            + i128::from(delta.milliseconds);
        let Ok(tail_ms) = i64::try_from(tail_ms) else {
            return Self::invalid();
        };
        match shifted.timestamp_millis().checked_add(tail_ms) {
            Some(ms) => Self::from_epoch_ms(ms),
            None => Self::invalid(),
        }
    }

    /// Apply a calendar delta with every component negated.
    #[must_use]
    pub fn subtract(&self, delta: &CalendarDelta) -> Self {
        self.add(&delta.negated())
    }

    /// Difference `self - other` in the given fixed-width unit, truncated
    /// toward zero. `None` if either instant is invalid.
    #[must_use]
    pub fn diff(&self, other: &Self, unit: DiffUnit) -> Option<i64> {
        let delta = self.epoch_ms? - other.epoch_ms?;
        Some(delta / unit.divisor_ms())
    }

    /// Absolute difference in the given fixed-width unit.
    #[must_use]
    pub fn diff_abs(&self, other: &Self, unit: DiffUnit) -> Option<i64> {
        self.diff(other, unit).map(i64::abs)
    }

    /// Elapsed time since `then`, measured at `now` (defaults to the
    /// current instant). Negative when `then` is in the future.
    #[must_use]
    pub fn since(then: Self, now: Option<Self>) -> Duration {
        let now = now.unwrap_or_else(Self::now);
        Self::between(then, now)
    }

    /// Elapsed time from `start` to `end`. Negative when `end` precedes
    /// `start`. Invalid inputs coerce to a zero duration.
    #[must_use]
    pub fn between(start: Self, end: Self) -> Duration {
        match end.diff(&start, DiffUnit::Seconds) {
            Some(secs) => Duration::from_secs(secs),
            None => {
                tracing::trace!("duration between invalid instants, coercing to zero");
                Duration::zero()
            }
        }
    }

    /// Human phrase for how far `then` lies from `now` (defaults to the
    /// current instant): `"2 hours ago"`, `"5 minutes from now"`, or
    /// `"just now"` under one second.
    ///
    /// Granularity stops at days; weeks, months, and years are out of
    /// scope. Invalid inputs fall through every threshold and render
    /// `"just now"`.
    #[must_use]
    pub fn relative(then: Self, now: Option<Self>) -> String {
        let now = now.unwrap_or_else(Self::now);
        let (Some(then_ms), Some(now_ms)) = (then.epoch_ms, now.epoch_ms) else {
            return "just now".to_string();
        };
        let delta = now_ms - then_ms;
        let magnitude = delta.abs();

        let (divisor, unit) = if magnitude >= MS_PER_DAY {
            (MS_PER_DAY, "day")
        } else if magnitude >= MS_PER_HOUR {
            (MS_PER_HOUR, "hour")
        } else if magnitude >= MS_PER_MINUTE {
            (MS_PER_MINUTE, "minute")
        } else if magnitude >= MS_PER_SECOND {
            (MS_PER_SECOND, "second")
        } else {
            return "just now".to_string();
        };

        let n = magnitude / divisor;
        let plural = if n == 1 { "" } else { "s" };
        if delta >= 0 {
            format!("{n} {unit}{plural} ago")
        } else {
            format!("{n} {unit}{plural} from now")
        }
    }
}

impl From<DateTime<Utc>> for Instant {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_epoch_ms(dt.timestamp_millis())
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_iso8601() {
            Some(iso) => f.write_str(&iso),
            None => f.write_str("invalid"),
        }
    }
}

/// Parse a zone-less date-time, down to a bare date at midnight.
fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Resolve a naive wall-clock time against the local zone.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a
/// spring-forward gap fall back to a UTC reading.
fn naive_local_to_utc(naive: &NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(naive),
    }
}

const fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

const fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

/// Calendar fields extracted once per format call.
struct Fields {
    year: i32,
    month: u32,
    day: u32,
    /// 0 = Sunday, matching `WEEKDAY_NAMES`.
    weekday: u32,
    hour: u32,
    minute: u32,
    second: u32,
    millis: u32,
    offset_secs: i32,
}

impl Fields {
    fn from_fixed(dt: DateTime<FixedOffset>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            weekday: dt.weekday().num_days_from_sunday(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
            millis: dt.timestamp_subsec_millis(),
            offset_secs: dt.offset().local_minus_utc(),
        }
    }

    fn offset(&self, colon: bool) -> String {
        let sign = if self.offset_secs < 0 { '-' } else { '+' };
        let total_minutes = self.offset_secs.abs() / 60;
        let (h, m) = (total_minutes / 60, total_minutes % 60);
        if colon {
            format!("{sign}{h:02}:{m:02}")
        } else {
            format!("{sign}{h:02}{m:02}")
        }
    }

    fn render(&self, tok: &str) -> String {
        let hour12 = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        let month_name = MONTH_NAMES[(self.month - 1) as usize];
        let weekday_name = WEEKDAY_NAMES[self.weekday as usize];
        match tok {
            "YYYY" => format!("{:04}", self.year),
            "YY" => format!("{:02}", self.year.rem_euclid(100)),
            "MMMM" => month_name.to_string(),
            "MMM" => month_name[..3].to_string(),
            "MM" => format!("{:02}", self.month),
            "M" => self.month.to_string(),
            "DD" => format!("{:02}", self.day),
            "D" => self.day.to_string(),
            "dddd" => weekday_name.to_string(),
            "ddd" => weekday_name[..3].to_string(),
            "HH" => format!("{:02}", self.hour),
            "H" => self.hour.to_string(),
            "hh" => format!("{hour12:02}"),
            "h" => hour12.to_string(),
            "A" => if self.hour < 12 { "AM" } else { "PM" }.to_string(),
            "a" => if self.hour < 12 { "am" } else { "pm" }.to_string(),
            "mm" => format!("{:02}", self.minute),
            "m" => self.minute.to_string(),
            "ss" => format!("{:02}", self.second),
            "s" => self.second.to_string(),
            "SSS" => format!("{:03}", self.millis),
            "SS" => format!("{:02}", self.millis / 10),
            "S" => (self.millis / 100).to_string(),
            "Z" => self.offset(true),
            "ZZ" => self.offset(false),
            "ms" | "MS" => self.millis.to_string(),
            other => other.to_string(),
        }
    }
}

impl Serialize for Instant {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.to_iso8601() {
            Some(iso) => serializer.serialize_str(&iso),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Instant {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Millis(i64),
            Float(f64),
            Text(String),
        }

        // Accept the shapes the backend actually sends: canonical strings,
        // numeric epochs, null. All of them permissively.
        Ok(match Option::<Raw>::deserialize(deserializer)? {
            None => Self::invalid(),
            Some(Raw::Millis(ms)) => Self::from_epoch_ms(ms),
            Some(Raw::Float(f)) if f.is_finite() => Self::from_epoch_ms(f.trunc() as i64),
            Some(Raw::Float(_)) => Self::invalid(),
            Some(Raw::Text(s)) => Self::parse(&s),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masks;

    fn utc_instant(s: &str) -> Instant {
        let instant = Instant::parse(s);
        assert!(instant.is_valid(), "test input must parse: {s}");
        instant
    }

    // ========== Construction and Validity ==========

    #[test]
    fn epoch_round_trip() {
        assert_eq!(Instant::from_epoch_ms(0).epoch_ms(), Some(0));
        assert_eq!(
            Instant::from_epoch_ms(1_709_617_689_012).epoch_ms(),
            Some(1_709_617_689_012)
        );
        assert_eq!(Instant::from_epoch_ms(-86_400_000).epoch_ms(), Some(-86_400_000));
    }

    #[test]
    fn from_epoch_secs_scales_to_millis() {
        assert_eq!(Instant::from_epoch_secs(90_061).epoch_ms(), Some(90_061_000));
    }

    #[test]
    fn from_chrono_datetime_matches_parse() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(Instant::from(dt), Instant::parse("2024-01-01T10:00:00Z"));
    }

    #[test]
    fn out_of_range_epoch_is_invalid() {
        assert!(!Instant::from_epoch_ms(i64::MAX).is_valid());
        assert!(!Instant::from_epoch_secs(i64::MAX).is_valid());
    }

    #[test]
    fn invalid_is_distinct_from_absent() {
        let invalid = Instant::invalid();
        assert!(!invalid.is_valid());
        assert_eq!(invalid.epoch_ms(), None);
        assert_eq!(invalid.to_iso8601(), None);
        assert_eq!(invalid.to_string(), "invalid");
        // A copied instant keeps its value (copy-by-value construction).
        let copy = invalid;
        assert_eq!(copy, invalid);
    }

    // ========== Parsing ==========

    #[test]
    fn iso_round_trip_is_byte_identical() {
        for canonical in [
            "2024-01-01T10:00:00.123Z",
            "2024-12-31T23:59:59.999Z",
            "1969-07-20T20:17:40.000Z",
        ] {
            let parsed = Instant::parse(canonical);
            assert_eq!(parsed.to_iso8601().as_deref(), Some(canonical));
            assert_eq!(parsed.to_string(), canonical);
        }
    }

    #[test]
    fn parse_accepts_explicit_offsets() {
        let zulu = Instant::parse("2024-01-01T10:00:00Z");
        assert_eq!(Instant::parse("2024-01-01T12:00:00+02:00"), zulu);
        assert_eq!(Instant::parse("2024-01-01T12:00:00+0200"), zulu);
        assert_eq!(Instant::parse("2024-01-01T05:00:00-05:00"), zulu);
    }

    #[test]
    fn parse_normalizes_database_timestamps() {
        // Space-separated timestamps get the separator normalized before
        // parsing, so an offset-carrying database row parses exactly.
        assert_eq!(
            Instant::parse("2024-01-01 10:00:00Z"),
            Instant::parse("2024-01-01T10:00:00Z")
        );
    }

    #[test]
    fn parse_assume_utc_reinterprets_naive_wall_clock() {
        let opts = ParseOptions { assume_utc: true };
        let parsed = Instant::parse_with("2024-01-01 10:00:00", opts);
        let iso = parsed.to_iso8601().unwrap();
        assert!(iso.starts_with("2024-01-01T10:00:00"), "got {iso}");
    }

    #[test]
    fn parse_assume_utc_keeps_fractional_seconds() {
        let opts = ParseOptions { assume_utc: true };
        let parsed = Instant::parse_with("2024-01-01 10:00:00.250", opts);
        assert_eq!(parsed.to_iso8601().as_deref(), Some("2024-01-01T10:00:00.250Z"));
    }

    #[test]
    fn parse_assume_utc_leaves_explicit_offsets_alone() {
        let opts = ParseOptions { assume_utc: true };
        assert_eq!(
            Instant::parse_with("2024-01-01T12:00:00+02:00", opts),
            Instant::parse("2024-01-01T10:00:00Z")
        );
    }

    #[test]
    fn parse_date_only_is_midnight() {
        let opts = ParseOptions { assume_utc: true };
        let parsed = Instant::parse_with("2024-06-15", opts);
        assert_eq!(parsed.to_iso8601().as_deref(), Some("2024-06-15T00:00:00.000Z"));
    }

    #[test]
    fn parse_naive_local_is_valid() {
        // The exact epoch depends on the host zone; validity does not.
        assert!(Instant::parse("2024-01-01T10:00:00").is_valid());
        assert!(Instant::parse("2024-01-01 10:00:00").is_valid());
    }

    #[test]
    fn parse_garbage_is_invalid() {
        for input in ["", "   ", "not a date", "2024-13-01T00:00:00Z", "99:99"] {
            assert!(!Instant::parse(input).is_valid(), "should not parse: {input:?}");
        }
    }

    // ========== Calendar Arithmetic ==========

    #[test]
    fn add_fixed_units_inverts_exactly() {
        let base = utc_instant("2024-03-10T12:00:00.000Z");
        let delta = CalendarDelta {
            days: 2,
            hours: 3,
            minutes: 4,
            seconds: 5,
            milliseconds: 6,
            ..CalendarDelta::default()
        };
        assert_eq!(base.add(&delta).subtract(&delta), base);
    }

    #[test]
    fn add_months_clips_to_shorter_month() {
        let jan31 = utc_instant("2024-01-31T10:00:00.000Z");
        let delta = CalendarDelta {
            months: 1,
            ..CalendarDelta::default()
        };
        let feb = jan31.add(&delta);
        assert_eq!(feb.format_utc(masks::DATE_YMD), "2024-02-29");
        // Clipping makes month arithmetic non-invertible.
        assert_eq!(feb.subtract(&delta).format_utc(masks::DATE_YMD), "2024-01-29");
    }

    #[test]
    fn add_year_across_leap_day_clips() {
        let leap = utc_instant("2024-02-29T00:00:00.000Z");
        let delta = CalendarDelta {
            years: 1,
            ..CalendarDelta::default()
        };
        assert_eq!(leap.add(&delta).format_utc("YYYY-MM-DD"), "2025-02-28");
    }

    #[test]
    fn add_rolls_over_hour_and_day_boundaries() {
        let late = utc_instant("2024-01-01T23:30:00.000Z");
        let delta = CalendarDelta {
            minutes: 45,
            ..CalendarDelta::default()
        };
        assert_eq!(
            late.add(&delta).to_iso8601().as_deref(),
            Some("2024-01-02T00:15:00.000Z")
        );
    }

    #[test]
    fn add_negative_months_crosses_year_boundary() {
        let jan = utc_instant("2024-01-15T00:00:00.000Z");
        let delta = CalendarDelta {
            months: -2,
            ..CalendarDelta::default()
        };
        assert_eq!(jan.add(&delta).format_utc("YYYY-MM-DD"), "2023-11-15");
    }

    #[test]
    fn add_on_invalid_stays_invalid() {
        let delta = CalendarDelta {
            days: 1,
            ..CalendarDelta::default()
        };
        assert!(!Instant::invalid().add(&delta).is_valid());
    }

    // ========== Diff ==========

    #[test]
    fn diff_uses_fixed_divisors() {
        let a = Instant::from_epoch_ms(90_061_000);
        let b = Instant::from_epoch_ms(0);
        assert_eq!(a.diff(&b, DiffUnit::Milliseconds), Some(90_061_000));
        assert_eq!(a.diff(&b, DiffUnit::Seconds), Some(90_061));
        assert_eq!(a.diff(&b, DiffUnit::Minutes), Some(1_501));
        assert_eq!(a.diff(&b, DiffUnit::Hours), Some(25));
        assert_eq!(a.diff(&b, DiffUnit::Days), Some(1));
    }

    #[test]
    fn diff_is_signed_and_diff_abs_is_not() {
        let a = Instant::from_epoch_ms(90_061_000);
        let b = Instant::from_epoch_ms(0);
        assert_eq!(b.diff(&a, DiffUnit::Hours), Some(-25));
        assert_eq!(b.diff_abs(&a, DiffUnit::Hours), Some(25));
    }

    #[test]
    fn diff_with_invalid_is_none() {
        let a = Instant::from_epoch_ms(0);
        assert_eq!(a.diff(&Instant::invalid(), DiffUnit::Seconds), None);
        assert_eq!(Instant::invalid().diff(&a, DiffUnit::Seconds), None);
    }

    #[test]
    fn diff_unit_parses_and_displays() {
        assert_eq!("h".parse::<DiffUnit>().unwrap(), DiffUnit::Hours);
        assert_eq!(DiffUnit::Days.to_string(), "d");
        assert!("fortnight".parse::<DiffUnit>().is_err());
    }

    // ========== Durations Between Instants ==========

    #[test]
    fn between_produces_signed_duration() {
        let start = Instant::from_epoch_ms(0);
        let end = Instant::from_epoch_ms(3_725_000);
        assert_eq!(Instant::between(start, end).total_seconds(), 3_725);
        assert_eq!(Instant::between(end, start).total_seconds(), -3_725);
    }

    #[test]
    fn since_measures_at_supplied_now() {
        let then = Instant::from_epoch_ms(0);
        let now = Instant::from_epoch_ms(65_000);
        assert_eq!(Instant::since(then, Some(now)).total_seconds(), 65);
    }

    #[test]
    fn between_invalid_coerces_to_zero() {
        let end = Instant::from_epoch_ms(1_000);
        assert!(Instant::between(Instant::invalid(), end).is_zero());
    }

    // ========== Relative Phrasing ==========

    #[test]
    fn relative_at_exact_hour_threshold() {
        let now = Instant::from_epoch_ms(3_600_000);
        let then = Instant::from_epoch_ms(0);
        assert_eq!(Instant::relative(then, Some(now)), "1 hour ago");
    }

    #[test]
    fn relative_future_minutes() {
        let now = Instant::from_epoch_ms(0);
        let then = Instant::from_epoch_ms(120_000);
        assert_eq!(Instant::relative(then, Some(now)), "2 minutes from now");
    }

    #[test]
    fn relative_below_one_second_is_just_now() {
        let now = Instant::from_epoch_ms(999);
        let then = Instant::from_epoch_ms(0);
        assert_eq!(Instant::relative(then, Some(now)), "just now");
    }

    #[test]
    fn relative_pluralizes_days() {
        let now = Instant::from_epoch_ms(172_800_000);
        let then = Instant::from_epoch_ms(0);
        assert_eq!(Instant::relative(then, Some(now)), "2 days ago");
    }

    #[test]
    fn relative_invalid_falls_through_to_just_now() {
        let now = Instant::from_epoch_ms(0);
        assert_eq!(Instant::relative(Instant::invalid(), Some(now)), "just now");
    }

    // ========== Formatting ==========

    #[test]
    fn token_greediness_renders_full_year() {
        let instant = utc_instant("2024-03-05T07:08:09.012Z");
        assert_eq!(instant.format_utc("YYYY"), "2024");
        assert_eq!(instant.format_utc("YY"), "24");
    }

    #[test]
    fn format_utc_calendar_fields() {
        let instant = utc_instant("2024-03-05T07:08:09.012Z");
        assert_eq!(instant.format_utc("YYYY-MM-DD HH:mm:ss"), "2024-03-05 07:08:09");
        assert_eq!(instant.format_utc("ddd dddd"), "Tue Tuesday");
        assert_eq!(instant.format_utc("MMM MMMM"), "Mar March");
        assert_eq!(instant.format_utc("h A"), "7 AM");
    }

    #[test]
    fn format_twelve_hour_clock_edges() {
        let midnight = utc_instant("2024-03-05T00:30:00.000Z");
        let noon = utc_instant("2024-03-05T12:30:00.000Z");
        let evening = utc_instant("2024-03-05T19:00:00.000Z");
        assert_eq!(midnight.format_utc("h A"), "12 AM");
        assert_eq!(noon.format_utc("h A"), "12 PM");
        assert_eq!(evening.format_utc("hh a"), "07 pm");
    }

    #[test]
    fn format_offset_tokens_for_utc() {
        let instant = utc_instant("2024-03-05T07:08:09.012Z");
        assert_eq!(instant.format_utc("Z"), "+00:00");
        assert_eq!(instant.format_utc("ZZ"), "+0000");
    }

    #[test]
    fn format_invalid_renders_nan_sentinels() {
        // The permissive contract: no panic, every slot gets the sentinel.
        assert_eq!(Instant::invalid().format("YYYY-MM-DD"), "NaN-NaN-NaN");
        assert_eq!(Instant::invalid().format_utc("HH:mm"), "NaN:NaN");
    }

    #[test]
    fn calendar_mask_reference_table() {
        let instant = utc_instant("2024-03-05T19:08:09.012Z");
        let masks = [
            "YYYY-MM-DD",
            "YY/M/D",
            "dddd, MMMM D",
            "ddd MMM DD",
            "HH:mm:ss.SSS",
            "h:mm A",
            "hh:mm a",
            "H:m:s",
            "S SS SSS",
            "Z ZZ",
        ];
        let table = masks
            .iter()
            .map(|mask| format!("{mask} => {}", instant.format_utc(mask)))
            .collect::<Vec<_>>()
            .join("\n");
        insta::assert_snapshot!(table, @r"
        YYYY-MM-DD => 2024-03-05
        YY/M/D => 24/3/5
        dddd, MMMM D => Tuesday, March 5
        ddd MMM DD => Tue Mar 05
        HH:mm:ss.SSS => 19:08:09.012
        h:mm A => 7:08 PM
        hh:mm a => 07:08 pm
        H:m:s => 19:8:9
        S SS SSS => 0 01 012
        Z ZZ => +00:00 +0000
        ");
    }

    // ========== Serde ==========

    #[test]
    fn serde_round_trips_canonical_string() {
        let instant = utc_instant("2024-03-05T07:08:09.012Z");
        let json = serde_json::to_string(&instant).unwrap();
        assert_eq!(json, "\"2024-03-05T07:08:09.012Z\"");
        let parsed: Instant = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, instant);
    }

    #[test]
    fn serde_invalid_serializes_as_null() {
        let json = serde_json::to_string(&Instant::invalid()).unwrap();
        assert_eq!(json, "null");
        let parsed: Instant = serde_json::from_str("null").unwrap();
        assert!(!parsed.is_valid());
    }

    #[test]
    fn serde_accepts_numeric_epochs() {
        let parsed: Instant = serde_json::from_str("90061000").unwrap();
        assert_eq!(parsed.epoch_ms(), Some(90_061_000));
    }

    #[test]
    fn serde_unparseable_string_is_invalid_not_error() {
        let parsed: Instant = serde_json::from_str("\"definitely not a date\"").unwrap();
        assert!(!parsed.is_valid());
    }
}
