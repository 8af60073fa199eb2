//! Door actuator trait definition.
//!
//! Adapters implement [`DoorActuator`] with native `async fn` methods (Rust
//! 1.90 + Edition 2024 RPITIT), so the trait is not object-safe. Dispatch
//! over the configured adapter goes through [`AnyDoor`](crate::AnyDoor).

#![allow(async_fn_in_trait)]

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::signals::ActuationSignals;

/// Which adapter is behind a door, for logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterInfo {
    /// Registry key, e.g. `hue`.
    pub kind: String,

    /// Device the adapter drives, e.g. a bridge address and light id.
    pub target: String,
}

impl AdapterInfo {
    pub fn new(kind: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: target.into(),
        }
    }
}

/// Hardware contract for a door relay.
pub trait DoorActuator: Send + Sync {
    fn info(&self) -> AdapterInfo;

    /// Whether the relay currently holds the door open.
    ///
    /// # Errors
    ///
    /// Returns a [`DoorError`](crate::DoorError) if the device cannot be
    /// queried or its answer cannot be decoded.
    async fn is_open(&self) -> Result<bool>;

    /// Run one open, hold and relock cycle.
    ///
    /// Implementations must report through `signals` as soon as the relay
    /// has been switched on (or failed to), then again once it has been
    /// switched off. Failures are reported through the signals, never
    /// returned.
    async fn open(&self, signals: ActuationSignals);
}
