use thiserror::Error;

/// Errors raised while parsing the policy inputs stored on a user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid schedule {input:?}: {reason}")]
    InvalidSchedule { input: String, reason: String },

    #[error("Invalid TTL {input:?}: {reason}")]
    InvalidTtl { input: String, reason: String },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

impl Error {
    pub fn schedule(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchedule {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn ttl(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTtl {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
