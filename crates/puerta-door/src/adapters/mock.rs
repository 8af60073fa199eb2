//! In-memory door for testing and dry runs.
//!
//! The mock behaves like a relay that switches instantly. Tests steer it
//! through a [`MockDoorHandle`]: failures can be injected for each phase,
//! the hold can be shortened, and the relock can be made to never arrive.
//! The handle also counts how many times `open` was invoked.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use puerta_core::constants::DEFAULT_HOLD_MS;
use serde::Deserialize;
use tracing::debug;

use crate::error::{DoorError, Result};
use crate::signals::ActuationSignals;
use crate::traits::{AdapterInfo, DoorActuator};

/// Parameters accepted by the `dry-run` adapter kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MockDoorConfig {
    /// Whether the door starts out open.
    pub open: bool,
    pub failed_to_open: bool,
    pub failed_to_close: bool,
    pub hold_ms: u64,
}

impl Default for MockDoorConfig {
    fn default() -> Self {
        Self {
            open: false,
            failed_to_open: false,
            failed_to_close: false,
            hold_ms: DEFAULT_HOLD_MS,
        }
    }
}

#[derive(Debug, Clone)]
struct Behavior {
    fail_status: bool,
    fail_start: bool,
    fail_close: bool,
    stall: bool,
    hold: Duration,
}

#[derive(Debug)]
struct Shared {
    open: AtomicBool,
    open_calls: AtomicUsize,
    behavior: Mutex<Behavior>,
}

impl Shared {
    fn behavior(&self) -> Behavior {
        self.behavior
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut Behavior)) {
        f(&mut self.behavior.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

/// Mock door relay.
///
/// # Examples
///
/// ```
/// use puerta_door::mock::MockDoor;
/// use puerta_door::{DoorActuator, signals};
///
/// #[tokio::main]
/// async fn main() {
///     let (door, handle) = MockDoor::new();
///     handle.set_hold(std::time::Duration::ZERO);
///
///     let (signals, watch) = signals::channel();
///     door.open(signals).await;
///
///     assert!(watch.started.await.unwrap().is_ok());
///     assert!(watch.finished.await.unwrap().is_ok());
///     assert_eq!(handle.open_calls(), 1);
/// }
/// ```
#[derive(Debug)]
pub struct MockDoor {
    shared: Arc<Shared>,
}

impl MockDoor {
    /// Create a closed mock door with the default hold.
    pub fn new() -> (Self, MockDoorHandle) {
        Self::with_config(MockDoorConfig::default())
    }

    pub fn with_config(config: MockDoorConfig) -> (Self, MockDoorHandle) {
        let shared = Arc::new(Shared {
            open: AtomicBool::new(config.open),
            open_calls: AtomicUsize::new(0),
            behavior: Mutex::new(Behavior {
                fail_status: false,
                fail_start: config.failed_to_open,
                fail_close: config.failed_to_close,
                stall: false,
                hold: Duration::from_millis(config.hold_ms),
            }),
        });

        let handle = MockDoorHandle {
            shared: Arc::clone(&shared),
        };

        (Self { shared }, handle)
    }
}

impl DoorActuator for MockDoor {
    fn info(&self) -> AdapterInfo {
        AdapterInfo::new("dry-run", "memory")
    }

    async fn is_open(&self) -> Result<bool> {
        if self.shared.behavior().fail_status {
            return Err(DoorError::communication("simulated status failure"));
        }
        Ok(self.shared.open.load(Ordering::SeqCst))
    }

    async fn open(&self, signals: ActuationSignals) {
        self.shared.open_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.shared.behavior();

        if behavior.fail_start {
            signals.begin(Err(DoorError::communication("simulated failure to open")));
            return;
        }

        self.shared.open.store(true, Ordering::SeqCst);
        let Some(completion) = signals.begin(Ok(())) else {
            return;
        };
        debug!(hold_ms = behavior.hold.as_millis() as u64, "mock door open");

        tokio::time::sleep(behavior.hold).await;

        if behavior.stall {
            // Keep the completion half alive so the channel never closes.
            let _completion = completion;
            std::future::pending::<()>().await;
            return;
        }

        if behavior.fail_close {
            completion.complete(Err(DoorError::communication("simulated failure to close")));
            return;
        }

        self.shared.open.store(false, Ordering::SeqCst);
        debug!("mock door closed");
        completion.complete(Ok(()));
    }
}

/// Handle for steering a [`MockDoor`].
///
/// Cheap to clone and safe to use from any task.
#[derive(Debug, Clone)]
pub struct MockDoorHandle {
    shared: Arc<Shared>,
}

impl MockDoorHandle {
    /// Number of times `open` has been invoked.
    pub fn open_calls(&self) -> usize {
        self.shared.open_calls.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    pub fn set_open(&self, open: bool) {
        self.shared.open.store(open, Ordering::SeqCst);
    }

    /// Make `is_open` fail.
    pub fn fail_status(&self, fail: bool) {
        self.shared.update(|b| b.fail_status = fail);
    }

    /// Make `open` report a start failure.
    pub fn fail_start(&self, fail: bool) {
        self.shared.update(|b| b.fail_start = fail);
    }

    /// Make `open` report a relock failure after the hold.
    pub fn fail_close(&self, fail: bool) {
        self.shared.update(|b| b.fail_close = fail);
    }

    /// Make `open` never report relock.
    pub fn stall(&self, stall: bool) {
        self.shared.update(|b| b.stall = stall);
    }

    pub fn set_hold(&self, hold: Duration) {
        self.shared.update(|b| b.hold = hold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals;

    fn instant_door() -> (MockDoor, MockDoorHandle) {
        let (door, handle) = MockDoor::new();
        handle.set_hold(Duration::ZERO);
        (door, handle)
    }

    #[tokio::test]
    async fn test_open_cycle_closes_again() {
        let (door, handle) = instant_door();
        let (signals, watch) = signals::channel();

        door.open(signals).await;

        assert!(watch.started.await.unwrap().is_ok());
        assert!(watch.finished.await.unwrap().is_ok());
        assert!(!handle.is_open());
        assert_eq!(handle.open_calls(), 1);
    }

    #[tokio::test]
    async fn test_start_failure() {
        let (door, handle) = instant_door();
        handle.fail_start(true);
        let (signals, watch) = signals::channel();

        door.open(signals).await;

        assert!(watch.started.await.unwrap().is_err());
        assert!(watch.finished.await.is_err());
        assert!(!handle.is_open());
    }

    #[tokio::test]
    async fn test_close_failure_leaves_door_open() {
        let (door, handle) = instant_door();
        handle.fail_close(true);
        let (signals, watch) = signals::channel();

        door.open(signals).await;

        assert!(watch.started.await.unwrap().is_ok());
        assert!(watch.finished.await.unwrap().is_err());
        assert!(door.is_open().await.unwrap());
    }

    #[tokio::test]
    async fn test_status_failure() {
        let (door, handle) = instant_door();
        handle.fail_status(true);
        assert!(matches!(
            door.is_open().await,
            Err(DoorError::Communication { .. })
        ));
    }

    #[test]
    fn test_config_from_params() {
        let config: MockDoorConfig =
            serde_json::from_value(serde_json::json!({ "failed_to_open": true })).unwrap();
        assert!(config.failed_to_open);
        assert!(!config.failed_to_close);
        assert_eq!(config.hold_ms, DEFAULT_HOLD_MS);
    }
}
