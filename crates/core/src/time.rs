//! Timestamp normalization
//!
//! The API is inconsistent about how it reports times: RFC 2822 strings on
//! most endpoints, integer seconds or milliseconds elsewhere. Everything is
//! converted to a [`Zoned`] in the configured display time zone.

use jiff::tz::TimeZone;
use jiff::civil::{Date, DateTime};
use jiff::{Timestamp, Zoned};
use serde_json::Value;

use crate::error::{Error, Result};

/// Integers with at least this many decimal digits are read as milliseconds
const MILLISECOND_DIGITS: u32 = 13;

/// A timestamp as found in a response or supplied by a caller
#[derive(Debug, Clone, PartialEq)]
pub enum TimeInput {
    Text(String),
    Integer(i64),
    Resolved(Zoned),
}

impl From<&str> for TimeInput {
    fn from(s: &str) -> Self {
        TimeInput::Text(s.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(s: String) -> Self {
        TimeInput::Text(s)
    }
}

impl From<i64> for TimeInput {
    fn from(n: i64) -> Self {
        TimeInput::Integer(n)
    }
}

impl From<Zoned> for TimeInput {
    fn from(z: Zoned) -> Self {
        TimeInput::Resolved(z)
    }
}

impl From<Timestamp> for TimeInput {
    fn from(ts: Timestamp) -> Self {
        TimeInput::Resolved(ts.to_zoned(TimeZone::UTC))
    }
}

impl TryFrom<&Value> for TimeInput {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(TimeInput::Text(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(TimeInput::Integer)
                .ok_or_else(|| Error::UnrecognizedTimeFormat(value.to_string())),
            other => Err(Error::UnrecognizedTimeFormat(other.to_string())),
        }
    }
}

/// Converts timestamps into one canonical representation
#[derive(Debug, Clone)]
pub struct TimeNormalizer {
    time_zone: TimeZone,
}

impl Default for TimeNormalizer {
    fn default() -> Self {
        Self::new(TimeZone::UTC)
    }
}

impl TimeNormalizer {
    pub fn new(time_zone: TimeZone) -> Self {
        Self { time_zone }
    }

    pub fn time_zone(&self) -> &TimeZone {
        &self.time_zone
    }

    /// Resolve `input` to an instant and present it in the display time zone
    pub fn normalize(&self, input: impl Into<TimeInput>) -> Result<Zoned> {
        let timestamp = match input.into() {
            TimeInput::Text(s) => self.parse_text(&s)?,
            TimeInput::Integer(n) => from_integer(n)?,
            TimeInput::Resolved(z) => z.timestamp(),
        };
        Ok(timestamp.to_zoned(self.time_zone.clone()))
    }

    /// Normalize a raw JSON field
    pub fn normalize_value(&self, value: &Value) -> Result<Zoned> {
        self.normalize(TimeInput::try_from(value)?)
    }

    /// Offset-bearing forms first; text without an offset is read as wall
    /// clock time in the display time zone.
    fn parse_text(&self, s: &str) -> Result<Timestamp> {
        let s = s.trim();
        if let Ok(zoned) = jiff::fmt::rfc2822::parse(s) {
            return Ok(zoned.timestamp());
        }
        if let Ok(ts) = s.parse::<Timestamp>() {
            return Ok(ts);
        }
        if let Ok(ts) =
            jiff::fmt::strtime::parse("%Y-%m-%d %H:%M:%S %z", s).and_then(|tm| tm.to_timestamp())
        {
            return Ok(ts);
        }
        civil_datetime(s)
            .and_then(|dt| {
                self.time_zone
                    .to_ambiguous_zoned(dt)
                    .compatible()
                    .ok()
            })
            .map(|zoned| zoned.timestamp())
            .ok_or_else(|| Error::UnrecognizedTimeFormat(format!("{s:?}")))
    }
}

/// `2021-09-25T04:44:32`, `2021-09-25 04:44:32` or a bare date at midnight
fn civil_datetime(s: &str) -> Option<DateTime> {
    if let Ok(dt) = s.parse::<DateTime>() {
        return Some(dt);
    }
    s.parse::<Date>().ok().map(|d| d.to_datetime(jiff::civil::Time::midnight()))
}

/// Seconds below 13 digits; otherwise the last three digits are milliseconds.
///
/// This is a magnitude heuristic: a seconds value with 13 or more digits
/// (beyond the year 2286) would be misread as milliseconds.
fn from_integer(n: i64) -> Result<Timestamp> {
    let digits = n.unsigned_abs().checked_ilog10().map_or(1, |d| d + 1);
    let result = if digits < MILLISECOND_DIGITS {
        Timestamp::from_second(n)
    } else {
        let seconds = n / 1000;
        let millis = (n % 1000) as i32;
        Timestamp::new(seconds, millis * 1_000_000)
    };
    result.map_err(|_| Error::UnrecognizedTimeFormat(n.to_string()))
}
