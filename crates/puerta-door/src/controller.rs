//! Single arbiter for door actuation.
//!
//! The controller owns the configured adapter and a two-state machine:
//!
//! - `Idle`: no actuation in progress
//! - `Opening`: an entry request was accepted and the relay has not been
//!   confirmed closed yet
//!
//! # Valid Transitions
//!
//! - Idle → Opening when a request is accepted
//! - Opening → Idle on a status or start failure, on relock, on a relock
//!   failure, or when the watchdog gives up waiting for relock
//!
//! # Request flow
//!
//! [`DoorController::request_entry`] claims the door, asks the adapter
//! whether the door is already open, then spawns the actuation together with
//! a supervising task and returns as soon as the adapter reports that the
//! relay switched on. The supervisor owns the claim from the moment it is
//! spawned until relock, so neither the hold nor a requester that goes away
//! can release the door early.
//!
//! The state mutex is only ever held to read or flip the state, never across
//! adapter I/O, so [`DoorController::state`] never blocks on the hardware.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use puerta_door::{DoorController, DoorState, mock::MockDoor};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (door, handle) = MockDoor::new();
//!     handle.set_hold(Duration::from_millis(10));
//!     let controller = DoorController::new(door);
//!
//!     controller.request_entry("alice").await.unwrap();
//!     assert_eq!(controller.state(), DoorState::Opening);
//! }
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use puerta_core::constants::DEFAULT_MAX_CYCLE_MS;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::adapters::AnyDoor;
use crate::error::{DoorError, EntryError};
use crate::signals::{self, ActuationWatch};
use crate::traits::DoorActuator;

/// Door controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    Idle,
    Opening,
}

impl DoorState {
    pub fn can_transition_to(&self, next: DoorState) -> bool {
        matches!(
            (self, next),
            (DoorState::Idle, DoorState::Opening) | (DoorState::Opening, DoorState::Idle)
        )
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoorState::Idle => write!(f, "idle"),
            DoorState::Opening => write!(f, "opening"),
        }
    }
}

/// Door controller tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// How long to wait for relock before resetting to `Idle` anyway.
    pub max_cycle: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_cycle: Duration::from_millis(DEFAULT_MAX_CYCLE_MS),
        }
    }
}

impl ControllerConfig {
    pub fn max_cycle(mut self, max_cycle: Duration) -> Self {
        self.max_cycle = max_cycle;
        self
    }
}

/// Exclusive hold on the `Opening` state.
///
/// Dropping the claim returns the controller to `Idle`. Before the actuation
/// is spawned the requester owns it; afterwards the cycle supervisor does.
#[derive(Debug)]
struct Claim {
    state: Arc<Mutex<DoorState>>,
}

impl Drop for Claim {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        debug_assert!(state.can_transition_to(DoorState::Idle));
        *state = DoorState::Idle;
    }
}

/// Serializes entry requests against one door.
///
/// Cloning is cheap and every clone arbitrates the same door.
#[derive(Debug, Clone)]
pub struct DoorController {
    door: Arc<AnyDoor>,
    state: Arc<Mutex<DoorState>>,
    config: ControllerConfig,
}

impl DoorController {
    pub fn new(door: impl Into<AnyDoor>) -> Self {
        Self::with_config(door, ControllerConfig::default())
    }

    pub fn with_config(door: impl Into<AnyDoor>, config: ControllerConfig) -> Self {
        Self {
            door: Arc::new(door.into()),
            state: Arc::new(Mutex::new(DoorState::Idle)),
            config,
        }
    }

    /// Current state, without touching the adapter.
    pub fn state(&self) -> DoorState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn door(&self) -> &AnyDoor {
        &self.door
    }

    fn claim(&self) -> Result<Claim, EntryError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.can_transition_to(DoorState::Opening) {
            return Err(EntryError::DoorBusy);
        }
        *state = DoorState::Opening;
        Ok(Claim {
            state: Arc::clone(&self.state),
        })
    }

    /// Open the door for `identity`.
    ///
    /// Returns once the adapter confirms the relay switched on; relock is
    /// awaited in the background.
    ///
    /// # Errors
    ///
    /// - [`EntryError::DoorBusy`] if another actuation holds the door. The
    ///   adapter is not touched.
    /// - [`EntryError::AlreadyOpen`] if the adapter reports the door open.
    /// - [`EntryError::Communication`] if the status check or the start of
    ///   the actuation fails.
    ///
    /// The controller is back to `Idle` after any error.
    pub async fn request_entry(&self, identity: &str) -> Result<(), EntryError> {
        let claim = self.claim()?;

        match self.door.is_open().await {
            Ok(false) => {}
            Ok(true) => {
                info!(user = identity, "door already open");
                return Err(EntryError::AlreadyOpen);
            }
            Err(err) => {
                error!(user = identity, error = %err, "could not read door status");
                return Err(EntryError::Communication(err));
            }
        }

        // Both tasks are spawned before the next await, so from here on the
        // claim belongs to the cycle and not to this caller.
        let (signals, watch) = signals::channel();
        let (started_tx, started_rx) = oneshot::channel();
        let door = Arc::clone(&self.door);
        tokio::spawn(async move { door.open(signals).await });
        tokio::spawn(supervise_cycle(
            claim,
            watch,
            started_tx,
            self.config.max_cycle,
            identity.to_string(),
        ));

        match started_rx.await {
            Ok(Ok(())) => {
                let adapter = self.door.info();
                info!(user = identity, adapter = %adapter.kind, target = %adapter.target, "door opened");
                Ok(())
            }
            Ok(Err(err)) => Err(EntryError::Communication(err)),
            Err(_) => Err(EntryError::Communication(DoorError::communication(
                "door cycle ended before reporting start",
            ))),
        }
    }
}

/// Holds the claim for one actuation: forwards the start outcome to the
/// requester, then waits for relock bounded by `max_cycle`.
async fn supervise_cycle(
    claim: Claim,
    watch: ActuationWatch,
    started: oneshot::Sender<Result<(), DoorError>>,
    max_cycle: Duration,
    identity: String,
) {
    let outcome = match watch.started.await {
        Ok(outcome) => outcome,
        Err(_) => Err(DoorError::communication(
            "adapter stopped before reporting start",
        )),
    };
    if let Err(err) = outcome {
        error!(user = %identity, error = %err, "door failed to open");
        // Idle before the requester hears about the failure.
        drop(claim);
        let _ = started.send(Err(err));
        return;
    }
    if started.send(Ok(())).is_err() {
        debug!(user = %identity, "requester went away, cycle continues");
    }

    let _claim = claim;
    match tokio::time::timeout(max_cycle, watch.finished).await {
        Ok(Ok(Ok(()))) => debug!(user = %identity, "door relocked"),
        Ok(Ok(Err(err))) => error!(user = %identity, error = %err, "door failed to relock"),
        Ok(Err(_)) => warn!(user = %identity, "adapter dropped the relock signal"),
        Err(_) => warn!(
            user = %identity,
            max_cycle_ms = max_cycle.as_millis() as u64,
            "no relock signal within the maximum cycle, releasing door"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockDoor, MockDoorHandle};

    fn controller(hold: Duration) -> (DoorController, MockDoorHandle) {
        let (door, handle) = MockDoor::new();
        handle.set_hold(hold);
        (DoorController::new(door), handle)
    }

    async fn wait_for_idle(controller: &DoorController) {
        for _ in 0..200 {
            if controller.state() == DoorState::Idle {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("controller never returned to idle");
    }

    #[test]
    fn test_state_transitions() {
        assert!(DoorState::Idle.can_transition_to(DoorState::Opening));
        assert!(DoorState::Opening.can_transition_to(DoorState::Idle));
        assert!(!DoorState::Opening.can_transition_to(DoorState::Opening));
        assert!(!DoorState::Idle.can_transition_to(DoorState::Idle));
    }

    #[tokio::test]
    async fn test_entry_returns_before_relock() {
        let (controller, handle) = controller(Duration::from_millis(100));

        controller.request_entry("alice").await.unwrap();

        assert_eq!(controller.state(), DoorState::Opening);
        assert!(handle.is_open());

        wait_for_idle(&controller).await;
        assert!(!handle.is_open());
    }

    #[tokio::test]
    async fn test_busy_while_opening() {
        let (controller, handle) = controller(Duration::from_millis(200));

        controller.request_entry("alice").await.unwrap();
        let second = controller.request_entry("bob").await;

        assert!(matches!(second, Err(EntryError::DoorBusy)));
        assert_eq!(handle.open_calls(), 1);
    }

    #[tokio::test]
    async fn test_start_failure_resets_state() {
        let (controller, handle) = controller(Duration::ZERO);
        handle.fail_start(true);

        let result = controller.request_entry("alice").await;
        assert!(matches!(result, Err(EntryError::Communication(_))));
        assert_eq!(controller.state(), DoorState::Idle);

        handle.fail_start(false);
        controller.request_entry("alice").await.unwrap();
        assert_eq!(handle.open_calls(), 2);
    }

    #[tokio::test]
    async fn test_already_open_is_not_actuated() {
        let (controller, handle) = controller(Duration::ZERO);
        handle.set_open(true);

        let result = controller.request_entry("alice").await;

        assert!(matches!(result, Err(EntryError::AlreadyOpen)));
        assert_eq!(controller.state(), DoorState::Idle);
        assert_eq!(handle.open_calls(), 0);
    }

    #[tokio::test]
    async fn test_status_failure_resets_state() {
        let (controller, handle) = controller(Duration::ZERO);
        handle.fail_status(true);

        let result = controller.request_entry("alice").await;

        assert!(matches!(result, Err(EntryError::Communication(_))));
        assert_eq!(controller.state(), DoorState::Idle);
        assert_eq!(handle.open_calls(), 0);
    }

    #[tokio::test]
    async fn test_relock_failure_still_releases() {
        let (controller, handle) = controller(Duration::ZERO);
        handle.fail_close(true);

        controller.request_entry("alice").await.unwrap();
        wait_for_idle(&controller).await;
    }

    #[tokio::test]
    async fn test_watchdog_releases_stalled_adapter() {
        let (door, handle) = MockDoor::new();
        handle.set_hold(Duration::ZERO);
        handle.stall(true);
        let controller = DoorController::with_config(
            door,
            ControllerConfig::default().max_cycle(Duration::from_millis(50)),
        );

        controller.request_entry("alice").await.unwrap();
        assert_eq!(controller.state(), DoorState::Opening);

        wait_for_idle(&controller).await;
    }

    #[tokio::test]
    async fn test_dropped_request_releases_claim() {
        let (controller, _handle) = controller(Duration::ZERO);

        {
            let _claim = controller.claim().unwrap();
            assert_eq!(controller.state(), DoorState::Opening);
        }

        assert_eq!(controller.state(), DoorState::Idle);
    }

    #[tokio::test]
    async fn test_abandoned_request_keeps_door_busy() {
        let (controller, handle) = controller(Duration::from_millis(300));

        let mut request = Box::pin(controller.request_entry("alice"));
        assert!(futures::poll!(&mut request).is_pending());
        drop(request);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.is_open());
        assert_eq!(controller.state(), DoorState::Opening);

        // The relay may read closed to a status check; the claim still holds.
        handle.set_open(false);
        let second = controller.request_entry("bob").await;
        assert!(matches!(second, Err(EntryError::DoorBusy)));
        assert_eq!(handle.open_calls(), 1);

        wait_for_idle(&controller).await;
    }
}
