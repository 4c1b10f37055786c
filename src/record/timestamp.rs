use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Canonical textual form. `%.f` emits 0, 3, 6 or 9 fractional digits,
/// whichever is the shortest exact rendering of the sub-second part.
const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Wall-clock instant with sub-second precision and no zone.
///
/// The acquisition pipeline records local receipt times, so the canonical
/// form carries no offset. RFC 3339 input with an offset is normalized to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid timestamp '{value}': expected an ISO 8601 date and time")]
pub struct TimestampParseError {
    pub value: String,
}

impl Timestamp {
    pub fn from_naive(value: NaiveDateTime) -> Self {
        Self(value)
    }

    /// Current local wall-clock time.
    pub fn now() -> Self {
        Self(Local::now().naive_local())
    }

    pub fn parse(text: &str) -> Result<Self, TimestampParseError> {
        for format in NAIVE_FORMATS {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
                return Ok(Self(parsed));
            }
        }

        // date only means midnight
        if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
            return Ok(Self(date.and_time(NaiveTime::MIN)));
        }

        DateTime::parse_from_rfc3339(text)
            .map(|parsed| Self(parsed.naive_utc()))
            .map_err(|_| TimestampParseError {
                value: text.to_string(),
            })
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }

    pub fn checked_add(&self, delta: TimeDelta) -> Option<Self> {
        self.0.checked_add_signed(delta).map(Self)
    }

    /// Signed number of seconds from `earlier` to `self`, with nanosecond resolution.
    pub fn seconds_since(&self, earlier: &Timestamp) -> f64 {
        let delta = self.0 - earlier.0;
        delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) / 1_000_000_000.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CANONICAL_FORMAT))
    }
}

impl FromStr for Timestamp {
    type Err = TimestampParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self(value)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Timestamp::parse(&text).map_err(de::Error::custom)
    }
}
