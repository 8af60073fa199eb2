use puerta_storage::StorageError;
use thiserror::Error;

use crate::webauthn::FlowKind;

/// Login and session failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown handle, wrong password or expired user.
    ///
    /// The message shown to callers is the same for every reason; `reason`
    /// is only meant for logs.
    #[error("Invalid credentials")]
    InvalidCredentials { reason: &'static str },

    /// No session with this token
    #[error("Session not found")]
    SessionNotFound,

    /// The session, or the user it belongs to, is past its expiry
    #[error("Session expired")]
    SessionExpired,

    /// Could not produce a session that expires within the calendar
    #[error("Session TTL out of range: {seconds}s")]
    TtlOutOfRange { seconds: u64 },

    /// Password hashing failed
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AuthError {
    pub fn invalid_credentials(reason: &'static str) -> Self {
        Self::InvalidCredentials { reason }
    }

    /// Whether the caller should be asked to log in again.
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, Self::SessionNotFound | Self::SessionExpired)
    }
}

/// Failure of the short-lived per-browser store.
#[derive(Debug, Error)]
#[error("Ephemeral store error: {message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// WebAuthn second-factor failures.
///
/// A challenge handed to the browser is not one of these: see
/// [`GateOutcome`](crate::webauthn::GateOutcome).
#[derive(Debug, Error)]
pub enum SecondFactorError {
    /// Finish step without a matching, unexpired begin step
    #[error("No pending {flow} challenge")]
    NoPendingChallenge { flow: FlowKind },

    /// Login finish step without a `webauthn` header
    #[error("Missing webauthn response")]
    MissingResponse,

    /// Response present but not decodable
    #[error("Malformed webauthn response: {message}")]
    MalformedResponse { message: String },

    /// Response decoded but failed verification
    #[error("Webauthn verification failed: {message}")]
    Rejected { message: String },

    /// Relying party could not produce a challenge
    #[error("Relying party error: {message}")]
    RelyingParty { message: String },

    /// Second factor requested for a user that does not need one
    #[error("Second factor is not required for this user")]
    NotRequired,

    /// Stored credential or challenge state is corrupt
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SecondFactorError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn relying_party(message: impl Into<String>) -> Self {
        Self::RelyingParty {
            message: message.into(),
        }
    }

    /// Whether the caller sent something unusable, as opposed to a
    /// verification failure or a server fault.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            Self::NoPendingChallenge { .. } | Self::MissingResponse | Self::MalformedResponse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
