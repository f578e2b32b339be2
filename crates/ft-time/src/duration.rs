//! Elapsed durations: clock-notation parsing and totals-oriented formatting.
//!
//! A [`Duration`] is a signed count of whole seconds, independent of any
//! calendar. Construction is permissive: malformed input coerces to zero
//! rather than erroring, so display code never has to unwrap. The canonical
//! string form (also the `Display` output) is `[-]H:MM:SS` with an
//! unbounded, unpadded hour count.

use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::token;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;
/// Approximate: a month is 30 days for breakdown purposes.
const SECS_PER_MONTH: i64 = 30 * SECS_PER_DAY;
/// Approximate: a year is 365 days for breakdown purposes.
const SECS_PER_YEAR: i64 = 365 * SECS_PER_DAY;

/// Duration formatting tokens. Substitution is longest-token-first, so
/// `tMS` wins over `tM`, and `mm` over `m`.
const DURATION_TOKENS: &[&str] = &[
    "YYYY", "YY", "Y", "MM", "M", "DD", "D", "HH", "H", "hh", "h", "A", "a", "mm", "m", "ss", "s",
    "SSS", "SS", "S", "tH", "tM", "tS", "tMS",
];

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&token::alternation(DURATION_TOKENS)).unwrap());

/// An immutable, signed, calendar-independent elapsed time.
///
/// Backed by a whole-seconds count; every arithmetic result re-derives from
/// a freshly computed total. Ordering compares total seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    secs: i64,
}

/// Hour/minute/second components for building a [`Duration`].
///
/// Combined as `hours*3600 + minutes*60 + seconds`; components may be
/// negative and are not normalized against each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationParts {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Duration {
    /// The zero-length duration.
    #[must_use]
    pub const fn zero() -> Self {
        Self { secs: 0 }
    }

    /// Construct from a whole-seconds count.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self { secs }
    }

    /// Construct from a fractional seconds count, truncating toward zero.
    /// Non-finite input coerces to zero.
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_finite() {
            Self {
                secs: secs.trunc() as i64,
            }
        } else {
            tracing::trace!(secs, "non-finite duration input, coercing to zero");
            Self::zero()
        }
    }

    /// Parse a compact clock notation.
    ///
    /// - optional sign and digits only: a whole-seconds count
    /// - three colon-delimited parts: `H:M:S`
    /// - two colon-delimited parts: `M:S` (never `H:M`)
    ///
    /// Anything else coerces to zero; this never errors.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let total = if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) {
            body.parse::<i64>().ok()
        } else {
            clock_parts(body)
        };

        match total {
            Some(secs) => Self {
                secs: if negative { -secs } else { secs },
            },
            None => {
                tracing::trace!(input, "unparseable duration input, coercing to zero");
                Self::zero()
            }
        }
    }

    /// Total whole seconds (signed).
    #[must_use]
    pub const fn total_seconds(&self) -> i64 {
        self.secs
    }

    /// Total whole minutes, truncated toward zero.
    #[must_use]
    pub const fn total_minutes(&self) -> i64 {
        self.secs / SECS_PER_MINUTE
    }

    /// Total whole hours, truncated toward zero.
    #[must_use]
    pub const fn total_hours(&self) -> i64 {
        self.secs / SECS_PER_HOUR
    }

    /// Total milliseconds.
    #[must_use]
    pub const fn total_milliseconds(&self) -> i64 {
        self.secs.saturating_mul(1_000)
    }

    /// The non-negative counterpart of this duration.
    #[must_use]
    pub const fn abs(&self) -> Self {
        Self {
            secs: self.secs.saturating_abs(),
        }
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.secs == 0
    }

    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.secs < 0
    }

    /// This duration plus a whole number of hours.
    #[must_use]
    pub const fn add_hours(&self, hours: i64) -> Self {
        Self {
            secs: self.secs.saturating_add(hours.saturating_mul(SECS_PER_HOUR)),
        }
    }

    /// This duration plus a whole number of minutes.
    #[must_use]
    pub const fn add_minutes(&self, minutes: i64) -> Self {
        Self {
            secs: self
                .secs
                .saturating_add(minutes.saturating_mul(SECS_PER_MINUTE)),
        }
    }

    /// This duration plus a whole number of seconds.
    #[must_use]
    pub const fn add_seconds(&self, seconds: i64) -> Self {
        Self {
            secs: self.secs.saturating_add(seconds),
        }
    }

    /// Render this duration through a token mask.
    ///
    /// The absolute value is broken down, in order, into approximate years
    /// (365-day units), approximate months (30-day units), days, then a
    /// 24-hour-clock hour remainder, minute remainder, and second
    /// remainder. The year/month/day breakdown is calendar-approximate,
    /// not calendar-accurate.
    ///
    /// Tokens: `Y/YY/YYYY` years, `M/MM` months, `D/DD` days, `H/HH` hour
    /// remainder, `h/hh` + `A/a` 12-hour remainder and meridiem, `m/mm`
    /// minutes, `s/ss` seconds, `S/SS/SSS` fractional seconds (always zero
    /// under whole-second storage), and unpadded totals `tH/tM/tS/tMS`.
    ///
    /// When the mask carries no hour token (`H`, `HH`, `h`, `hh`), `m`/`mm`
    /// render the unpadded *total* minutes instead of the minute-of-hour
    /// remainder, so `"mm:ss"` renders 3725 s as `"62:05"` rather than
    /// wrapping. A mask with no recognized token at all returns the
    /// canonical string unchanged. Negative durations render with a single
    /// leading `-`.
    #[must_use]
    pub fn format(&self, mask: &str) -> String {
        if DURATION_RE.find(mask).is_none() {
            return self.to_string();
        }
        let breakdown = Breakdown::of(self.secs.saturating_abs());
        let total_minutes_mode = !DURATION_RE
            .find_iter(mask)
            .any(|m| matches!(m.as_str(), "H" | "HH" | "h" | "hh"));
        let body = token::substitute(&DURATION_RE, mask, |tok| {
            breakdown.render(tok, total_minutes_mode)
        });
        if self.secs < 0 {
            format!("-{body}")
        } else {
            body
        }
    }
}

/// Interpret colon-delimited clock parts as whole seconds.
fn clock_parts(body: &str) -> Option<i64> {
    fn field(part: &str) -> Option<i64> {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse().ok()
    }

    let parts: Vec<&str> = body.split(':').collect();
    match parts.as_slice() {
        // Two parts are minutes:seconds, never hours:minutes. Existing call
        // sites depend on this reading.
        [m, s] => field(m)?
            .checked_mul(SECS_PER_MINUTE)?
            .checked_add(field(s)?),
        [h, m, s] => field(h)?
            .checked_mul(SECS_PER_HOUR)?
            .checked_add(field(m)?.checked_mul(SECS_PER_MINUTE)?)?
            .checked_add(field(s)?),
        _ => None,
    }
}

/// Approximate breakdown of an absolute seconds count.
struct Breakdown {
    years: i64,
    months: i64,
    days: i64,
    hour: i64,
    minute: i64,
    second: i64,
    /// The undecomposed total, for the `t*` tokens.
    total: i64,
}

impl Breakdown {
    fn of(total: i64) -> Self {
        let years = total / SECS_PER_YEAR;
        let rem = total % SECS_PER_YEAR;
        let months = rem / SECS_PER_MONTH;
        let rem = rem % SECS_PER_MONTH;
        let days = rem / SECS_PER_DAY;
        let rem = rem % SECS_PER_DAY;
        Self {
            years,
            months,
            days,
            hour: rem / SECS_PER_HOUR,
            minute: rem % SECS_PER_HOUR / SECS_PER_MINUTE,
            second: rem % SECS_PER_MINUTE,
            total,
        }
    }

    fn render(&self, tok: &str, total_minutes_mode: bool) -> String {
        let hour12 = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        match tok {
            "Y" => self.years.to_string(),
            "YY" => format!("{:02}", self.years),
            "YYYY" => format!("{:04}", self.years),
            "M" => self.months.to_string(),
            "MM" => format!("{:02}", self.months),
            "D" => self.days.to_string(),
            "DD" => format!("{:02}", self.days),
            "H" => self.hour.to_string(),
            "HH" => format!("{:02}", self.hour),
            "h" => hour12.to_string(),
            "hh" => format!("{hour12:02}"),
            "A" => if self.hour < 12 { "AM" } else { "PM" }.to_string(),
            "a" => if self.hour < 12 { "am" } else { "pm" }.to_string(),
            "m" | "mm" if total_minutes_mode => (self.total / SECS_PER_MINUTE).to_string(),
            "m" => self.minute.to_string(),
            "mm" => format!("{:02}", self.minute),
            "s" => self.second.to_string(),
            "ss" => format!("{:02}", self.second),
            // Whole-second storage: fractional-second tokens are always zero.
            "S" => "0".to_string(),
            "SS" => "00".to_string(),
            "SSS" => "000".to_string(),
            "tH" => (self.total / SECS_PER_HOUR).to_string(),
            "tM" => (self.total / SECS_PER_MINUTE).to_string(),
            "tS" => self.total.to_string(),
            "tMS" => self.total.saturating_mul(1_000).to_string(),
            other => other.to_string(),
        }
    }
}

/// Convenience formatter from a raw millisecond count, truncating toward
/// zero to whole seconds.
#[must_use]
pub fn format_duration_ms(ms: i64, mask: &str) -> String {
    Duration::from_secs(ms / 1_000).format(mask)
}

impl From<i64> for Duration {
    fn from(secs: i64) -> Self {
        Self::from_secs(secs)
    }
}

impl From<f64> for Duration {
    fn from(secs: f64) -> Self {
        Self::from_secs_f64(secs)
    }
}

impl From<&str> for Duration {
    fn from(input: &str) -> Self {
        Self::parse(input)
    }
}

impl From<DurationParts> for Duration {
    fn from(parts: DurationParts) -> Self {
        let secs = parts
            .hours
            .saturating_mul(SECS_PER_HOUR)
            .saturating_add(parts.minutes.saturating_mul(SECS_PER_MINUTE))
            .saturating_add(parts.seconds);
        Self { secs }
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            secs: self.secs.saturating_add(rhs.secs),
        }
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            secs: self.secs.saturating_sub(rhs.secs),
        }
    }
}

impl Neg for Duration {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            secs: self.secs.saturating_neg(),
        }
    }
}

impl fmt::Display for Duration {
    /// The canonical form: `[-]H:MM:SS` with unbounded, unpadded hours.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.secs.saturating_abs();
        let sign = if self.secs < 0 { "-" } else { "" };
        let hours = total / SECS_PER_HOUR;
        let minutes = total % SECS_PER_HOUR / SECS_PER_MINUTE;
        let seconds = total % SECS_PER_MINUTE;
        write!(f, "{sign}{hours}:{minutes:02}:{seconds:02}")
    }
}

impl Serialize for Duration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Secs(i64),
            Float(f64),
            Text(String),
        }

        // Canonical strings, raw second counts, or fractional seconds; all
        // permissively.
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Self::from_secs(secs),
            Raw::Float(secs) => Self::from_secs_f64(secs),
            Raw::Text(s) => Self::parse(&s),
        })
    }
}
