//! Day-of-week and hour-of-day windows.
//!
//! A schedule is a space-separated list of clauses:
//!
//! ```text
//! days=<from>-<until>    0 = Sunday .. 6 = Saturday
//! hours=<from>-<until>   H, H.F or H:MM, 0..=24
//! ```
//!
//! Either clause may be omitted, in which case that dimension is
//! unconstrained. Bounds are inclusive, and each dimension gates
//! independently. The source text is kept so that a schedule written by an
//! administrator reads back exactly as it was stored.
//!
//! # Examples
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use puerta_core::Schedule;
//!
//! let schedule: Schedule = "days=1-5 hours=9-17".parse().unwrap();
//!
//! // 2024-03-06 was a Wednesday.
//! let wednesday = Utc.with_ymd_and_hms(2024, 3, 6, 10, 30, 0).unwrap();
//! assert!(schedule.allowed_at(&wednesday));
//!
//! let saturday = Utc.with_ymd_and_hms(2024, 3, 9, 10, 30, 0).unwrap();
//! assert!(!schedule.allowed_at(&saturday));
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Inclusive range of weekdays, numbered from Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub from: u8,
    pub until: u8,
}

impl DayRange {
    pub fn contains(&self, weekday: u8) -> bool {
        (self.from..=self.until).contains(&weekday)
    }
}

/// Inclusive range of fractional hours, e.g. `9.5` for 09:30.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourRange {
    pub from: f64,
    pub until: f64,
}

impl HourRange {
    pub fn contains(&self, hour: f64) -> bool {
        self.from <= hour && hour <= self.until
    }
}

/// Time window during which a user may request entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    source: String,
    days: Option<DayRange>,
    hours: Option<HourRange>,
}

impl Schedule {
    /// Text the schedule was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn days(&self) -> Option<DayRange> {
        self.days
    }

    pub fn hours(&self) -> Option<HourRange> {
        self.hours
    }

    /// Whether `at`, read on its own wall clock, falls inside both ranges.
    pub fn allowed_at<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        if let Some(days) = self.days
            && !days.contains(at.weekday().num_days_from_sunday() as u8)
        {
            return false;
        }

        if let Some(hours) = self.hours {
            let seconds = at.minute() * 60 + at.second();
            let hour = f64::from(at.hour()) + f64::from(seconds) / 3600.0;
            if !hours.contains(hour) {
                return false;
            }
        }

        true
    }
}

impl FromStr for Schedule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let source = s.trim();
        let mut schedule = Schedule {
            source: source.to_string(),
            days: None,
            hours: None,
        };

        for clause in source.split_whitespace() {
            let (key, value) = clause
                .split_once('=')
                .ok_or_else(|| Error::schedule(source, format!("clause {clause:?} has no '='")))?;
            let (from, until) = value
                .split_once('-')
                .ok_or_else(|| Error::schedule(source, format!("range {value:?} has no '-'")))?;

            match key {
                "days" => {
                    let range = DayRange {
                        from: parse_day(source, from)?,
                        until: parse_day(source, until)?,
                    };
                    if range.from > range.until {
                        return Err(Error::schedule(source, "day range starts after it ends"));
                    }
                    schedule.days = Some(range);
                }
                "hours" => {
                    let range = HourRange {
                        from: parse_hour(source, from)?,
                        until: parse_hour(source, until)?,
                    };
                    if range.from > range.until {
                        return Err(Error::schedule(source, "hour range starts after it ends"));
                    }
                    schedule.hours = Some(range);
                }
                other => {
                    return Err(Error::schedule(source, format!("unknown clause {other:?}")));
                }
            }
        }

        Ok(schedule)
    }
}

fn parse_day(source: &str, raw: &str) -> Result<u8> {
    let day: u8 = raw
        .parse()
        .map_err(|_| Error::schedule(source, format!("bad day {raw:?}")))?;
    if day > 6 {
        return Err(Error::schedule(source, format!("day {day} is not in 0-6")));
    }
    Ok(day)
}

/// `H`, `H.F` or `H:MM` to fractional hours.
fn parse_hour(source: &str, raw: &str) -> Result<f64> {
    let bad_hour = || Error::schedule(source, format!("bad hour {raw:?}"));

    let value = match raw.split_once(':') {
        Some((hour, minutes)) => {
            let hour: u8 = hour.parse().map_err(|_| bad_hour())?;
            let minutes: u8 = minutes
                .parse()
                .map_err(|_| Error::schedule(source, format!("bad minutes in {raw:?}")))?;
            if minutes >= 60 {
                return Err(Error::schedule(source, format!("minutes out of range in {raw:?}")));
            }
            f64::from(hour) + f64::from(minutes) / 60.0
        }
        None => {
            let hour: f64 = raw.parse().map_err(|_| bad_hour())?;
            if !hour.is_finite() || hour < 0.0 {
                return Err(bad_hour());
            }
            hour
        }
    };

    if value > 24.0 {
        return Err(Error::schedule(source, format!("hour {raw:?} is past 24:00")));
    }
    Ok(value)
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for Schedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
