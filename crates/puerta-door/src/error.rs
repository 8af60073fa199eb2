//! Error types for door adapters and the door controller.
//!
//! [`DoorError`] covers what can go wrong in a single adapter call.
//! [`EntryError`] is what a caller of
//! [`DoorController::request_entry`](crate::DoorController::request_entry)
//! sees, and is what the HTTP layer maps onto status codes.

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, DoorError>;

/// Errors that can occur while talking to door hardware.
#[derive(Debug, thiserror::Error)]
pub enum DoorError {
    /// Timeout, transport failure or non-success response.
    #[error("Communication error: {message}")]
    Communication { message: String },

    /// The device answered with something we could not decode.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// The bridge does not (or no longer) recognise our credential.
    #[error("Pairing required: {message}")]
    PairingRequired { message: String },

    /// Adapter parameters are missing or malformed.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// No adapter is registered under the configured kind.
    #[error("Unknown door adapter {kind:?}, expected one of: {}", .known.join(", "))]
    UnknownAdapter {
        kind: String,
        known: Vec<&'static str>,
    },
}

impl DoorError {
    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }

    /// Create a new protocol decode error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a new pairing-required error.
    pub fn pairing_required(message: impl Into<String>) -> Self {
        Self::PairingRequired {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for DoorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::protocol(err.to_string())
        } else {
            Self::communication(err.to_string())
        }
    }
}

/// Why an entry request did not open the door.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    /// Another actuation is in progress.
    #[error("Door is busy")]
    DoorBusy,

    /// The adapter reports the door is already open.
    #[error("Door is already open")]
    AlreadyOpen,

    /// The adapter failed before actuation started.
    #[error("Could not communicate with door: {0}")]
    Communication(#[source] DoorError),
}

impl EntryError {
    /// Stable identifier recorded in the audit log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DoorBusy => "door_busy",
            Self::AlreadyOpen => "door_already_open",
            Self::Communication(_) => "door_communication",
        }
    }
}
