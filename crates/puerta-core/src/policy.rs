//! Access policy evaluation.
//!
//! Every entry request is checked against two properties of the requesting
//! user: an optional absolute expiry and an optional [`Schedule`]. The
//! check is expressed as a trait with a provided method so that any record
//! carrying those two fields gets the same decision logic.
//!
//! # Usage
//!
//! ```
//! use chrono::{DateTime, TimeZone, Utc};
//! use puerta_core::{AccessWindow, Denial, Schedule};
//!
//! struct Guest {
//!     expires: Option<DateTime<Utc>>,
//!     schedule: Option<Schedule>,
//! }
//!
//! impl AccessWindow for Guest {
//!     fn expires(&self) -> Option<DateTime<Utc>> {
//!         self.expires
//!     }
//!
//!     fn schedule(&self) -> Option<&Schedule> {
//!         self.schedule.as_ref()
//!     }
//! }
//!
//! let guest = Guest {
//!     expires: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
//!     schedule: None,
//! };
//! let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
//! assert_eq!(guest.is_allowed(&now), Err(Denial::Expired));
//! ```

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::error::Error;
use crate::schedule::Schedule;

/// Reason an otherwise authenticated user may not enter.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    #[error("Access expired")]
    Expired,

    #[error("Outside of allowed schedule")]
    OutsideSchedule,
}

impl Denial {
    /// Stable identifier recorded in the audit log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Expired => "user_expired",
            Self::OutsideSchedule => "schedule_denied",
        }
    }
}

/// Anything with an expiry and a schedule.
pub trait AccessWindow {
    fn expires(&self) -> Option<DateTime<Utc>>;

    fn schedule(&self) -> Option<&Schedule>;

    /// Whether the subject may enter at `at`.
    ///
    /// Expiry is checked first and wins over the schedule.
    ///
    /// # Errors
    ///
    /// [`Denial::Expired`] when the expiry lies before `at`;
    /// [`Denial::OutsideSchedule`] when `at` falls outside the schedule on
    /// its own wall clock.
    fn is_allowed<Z: TimeZone>(&self, at: &DateTime<Z>) -> Result<(), Denial> {
        if let Some(expires) = self.expires()
            && expires < at.with_timezone(&Utc)
        {
            return Err(Denial::Expired);
        }

        if let Some(schedule) = self.schedule()
            && !schedule.allowed_at(at)
        {
            return Err(Denial::OutsideSchedule);
        }

        Ok(())
    }
}

/// Evaluates [`AccessWindow`]s on the site's wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    timezone: Tz,
}

impl AccessPolicy {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Build a policy from an IANA timezone name such as `America/Mexico_City`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTimezone`] if the name is not in the tz database.
    pub fn with_timezone_name(name: &str) -> Result<Self, Error> {
        Tz::from_str(name)
            .map(Self::new)
            .map_err(|_| Error::UnknownTimezone(name.to_string()))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn check<W: AccessWindow>(&self, subject: &W, now: DateTime<Utc>) -> Result<(), Denial> {
        subject.is_allowed(&now.with_timezone(&self.timezone))
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}
