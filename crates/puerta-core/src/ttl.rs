//! Session lifetimes with shorthand suffixes.
//!
//! A TTL is written as one or more `<integer><unit>` segments, e.g. `30d`,
//! `2w` or `1h30m`. Besides the usual `s`, `m` and `h` units, three long
//! suffixes are accepted:
//!
//! | Suffix | Length |
//! |--------|--------|
//! | `d` | 24 hours |
//! | `w` | 7 days |
//! | `M` | 30 weeks (`24 * 7 * 30` hours, the value existing records were written with) |
//!
//! # Examples
//!
//! ```
//! use puerta_core::Ttl;
//!
//! let ttl: Ttl = "7d".parse().unwrap();
//! assert_eq!(ttl.seconds(), 604_800);
//!
//! let mut ttl = Ttl::default();
//! ttl.apply("").unwrap();
//! assert_eq!(ttl, Ttl::default());
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const LONG_MONTH: u64 = 30 * WEEK;

/// Units in display order, largest first.
const UNITS: &[(&str, u64)] = &[
    ("M", LONG_MONTH),
    ("w", WEEK),
    ("d", DAY),
    ("h", HOUR),
    ("m", MINUTE),
    ("s", 1),
];

/// Maximum lifetime granted to a login session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ttl {
    seconds: u64,
}

impl Ttl {
    pub const fn from_seconds(seconds: u64) -> Self {
        Self { seconds }
    }

    pub const fn seconds(&self) -> u64 {
        self.seconds
    }

    pub const fn as_duration(&self) -> Duration {
        Duration::from_secs(self.seconds)
    }

    /// Parse `input` into `self`, leaving the current value untouched when
    /// the input is blank.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTtl`] when a non-blank input does not parse.
    pub fn apply(&mut self, input: &str) -> Result<()> {
        if input.trim().is_empty() {
            return Ok(());
        }
        *self = input.parse()?;
        Ok(())
    }

    /// Expiry of a session created at `start`, or `None` if it overflows
    /// the calendar.
    pub fn expiry_from(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let seconds = i64::try_from(self.seconds).ok()?;
        start.checked_add_signed(TimeDelta::try_seconds(seconds)?)
    }
}

impl Default for Ttl {
    fn default() -> Self {
        Self::from_seconds(30 * DAY)
    }
}

impl FromStr for Ttl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_segments(s.trim()).map(Self::from_seconds)
    }
}

fn parse_segments(input: &str) -> Result<u64> {
    if input.is_empty() {
        return Err(Error::ttl(input, "empty duration"));
    }

    let mut total: u64 = 0;
    let mut rest = input;

    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(Error::ttl(input, "expected a number"));
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|e| Error::ttl(input, format!("bad number: {e}")))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let Some((_, multiplier)) = UNITS.iter().find(|(name, _)| *name == unit) else {
            return Err(Error::ttl(
                input,
                if unit.is_empty() {
                    "missing unit".to_string()
                } else {
                    format!("unknown unit {unit:?}")
                },
            ));
        };

        total = value
            .checked_mul(*multiplier)
            .and_then(|s| total.checked_add(s))
            .ok_or_else(|| Error::ttl(input, "duration overflows"))?;
    }

    Ok(total)
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.seconds == 0 {
            return write!(f, "0s");
        }
        for (name, size) in UNITS {
            if self.seconds % size == 0 {
                return write!(f, "{}{}", self.seconds / size, name);
            }
        }
        write!(f, "{}s", self.seconds)
    }
}

impl Serialize for Ttl {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ttl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let mut ttl = Ttl::default();
        ttl.apply(&raw).map_err(serde::de::Error::custom)?;
        Ok(ttl)
    }
}
