//! Date normalization into the upstream wire format.
//!
//! The measurement API only accepts `YYYY-MM-DDTHH:MM:SSZ`. Users hand us
//! whatever they typed ("1/2/2020", "January 2, 2020", "2020-01-02"), so every
//! bound goes through [`normalize`] exactly once before any request is built.
//! Ambiguous numeric dates are read month-first.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::DateParseError;

/// Canonical wire format expected by the measurement API.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Inputs that carry an explicit UTC offset.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%dT%H:%M:%S%z"];

/// Inputs with a time of day but no zone; assumed UTC.
///
/// Same ordering rule as [`DATE_FORMATS`]: two-digit years first.
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
];

/// Date-only inputs; midnight UTC is implied.
///
/// Month-first shapes are tried before year-first ones: `%Y` accepts a single
/// digit, so "1/2/20" would otherwise read as year 1. A leading four-digit
/// year can never pass as a month, which keeps "2020-01-02" unambiguous.
/// Two-digit years come before their `%Y` twins for the same reason.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%y",
    "%m-%d-%Y",
    "%m.%d.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%b. %d, %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%Y%m%d",
];

// ---

/// A timestamp in the upstream wire format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalTimestamp(String);

impl CanonicalTimestamp {
    // ---
    fn from_naive(dt: NaiveDateTime) -> Self {
        Self(dt.format(WIRE_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalTimestamp {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Anything a caller may hand to [`normalize`].
#[derive(Debug, Clone, Copy)]
pub enum DateInput<'a> {
    // ---
    Text(&'a str),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Utc(DateTime<Utc>),
}

impl<'a> From<&'a str> for DateInput<'a> {
    fn from(s: &'a str) -> Self {
        DateInput::Text(s)
    }
}

impl<'a> From<&'a String> for DateInput<'a> {
    fn from(s: &'a String) -> Self {
        DateInput::Text(s.as_str())
    }
}

impl From<NaiveDate> for DateInput<'_> {
    fn from(d: NaiveDate) -> Self {
        DateInput::Date(d)
    }
}

impl From<NaiveDateTime> for DateInput<'_> {
    fn from(dt: NaiveDateTime) -> Self {
        DateInput::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for DateInput<'_> {
    fn from(dt: DateTime<Utc>) -> Self {
        DateInput::Utc(dt)
    }
}

/// Canonicalize a user-supplied date.
///
/// - `None` stays `None` (no bound).
/// - Text already ending in the `Z` marker is returned unchanged.
/// - Structured values are formatted directly, midnight for bare dates.
/// - Other text is parsed month-first and a missing time of day becomes
///   midnight.
/// - An explicit offset (`+02:00`) is applied, so the result is the same
///   instant in UTC rather than the wall-clock time with the offset dropped:
///   `2020-01-02T02:00:00+02:00` becomes `2020-01-02T00:00:00Z`.
///
/// # Errors
///
/// Returns [`DateParseError`] when text input matches no supported format.
pub fn normalize(input: Option<DateInput<'_>>) -> Result<Option<CanonicalTimestamp>, DateParseError> {
    // ---
    let Some(input) = input else {
        return Ok(None);
    };

    let canonical = match input {
        DateInput::Date(d) => CanonicalTimestamp::from_naive(d.and_time(NaiveTime::MIN)),
        DateInput::DateTime(dt) => CanonicalTimestamp::from_naive(dt),
        DateInput::Utc(dt) => CanonicalTimestamp::from_naive(dt.naive_utc()),
        DateInput::Text(s) if s.ends_with('Z') => CanonicalTimestamp(s.to_string()),
        DateInput::Text(s) => parse_text(s)?,
    };

    Ok(Some(canonical))
}

/// Shorthand for normalizing an optional raw string.
///
/// # Errors
///
/// See [`normalize`].
pub fn normalize_str(input: Option<&str>) -> Result<Option<CanonicalTimestamp>, DateParseError> {
    normalize(input.map(DateInput::Text))
}

fn parse_text(raw: &str) -> Result<CanonicalTimestamp, DateParseError> {
    // ---
    let s = raw.trim();
    if s.is_empty() {
        return Err(DateParseError {
            input: raw.to_string(),
            reason: "empty input".to_string(),
        });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(CanonicalTimestamp::from_naive(dt.naive_utc()));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(CanonicalTimestamp::from_naive(dt.naive_utc()));
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(CanonicalTimestamp::from_naive(dt));
        }
    }

    let mut last_err = None;
    for fmt in DATE_FORMATS {
        match NaiveDate::parse_from_str(s, fmt) {
            Ok(d) => return Ok(CanonicalTimestamp::from_naive(d.and_time(NaiveTime::MIN))),
            Err(e) => last_err = Some(e),
        }
    }

    Err(DateParseError {
        input: raw.to_string(),
        reason: match last_err {
            Some(e) => format!("unrecognized date format ({e})"),
            None => "unrecognized date format".to_string(),
        },
    })
}

/// Inclusive canonical bounds shared by every page request for a sensor.
///
/// Built once per invocation and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    // ---
    from: Option<CanonicalTimestamp>,
    to: Option<CanonicalTimestamp>,
}

impl DateRange {
    // ---
    /// Normalize both raw bounds.
    ///
    /// # Errors
    ///
    /// Returns the first [`DateParseError`] encountered, `from` before `to`.
    pub fn parse(raw_from: Option<&str>, raw_to: Option<&str>) -> Result<Self, DateParseError> {
        Ok(Self {
            from: normalize_str(raw_from)?,
            to: normalize_str(raw_to)?,
        })
    }

    pub fn new(from: Option<CanonicalTimestamp>, to: Option<CanonicalTimestamp>) -> Self {
        Self { from, to }
    }

    pub fn from(&self) -> Option<&CanonicalTimestamp> {
        self.from.as_ref()
    }

    pub fn to(&self) -> Option<&CanonicalTimestamp> {
        self.to.as_ref()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let from = self.from.as_ref().map_or("-", CanonicalTimestamp::as_str);
        let to = self.to.as_ref().map_or("-", CanonicalTimestamp::as_str);
        write!(f, "{from}..{to}")
    }
}
