//! Door hardware abstraction and actuation control for puerta.
//!
//! # Design
//!
//! - **Async-first**: adapters implement [`DoorActuator`] with native
//!   `async fn` in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Enum dispatch**: [`AnyDoor`] wraps the concrete adapters, selected
//!   at startup by [`adapters::connect`] from the configured kind.
//! - **Two-phase actuation**: adapters report start and relock separately
//!   through [`signals`], so callers only wait for the relay to switch on.
//! - **Single arbiter**: one [`DoorController`] per door decides whether a
//!   request may actuate at all.
//!
//! # Adapters
//!
//! | Kind | Device |
//! |------|--------|
//! | `hue` | relay wired as a light behind a Philips Hue bridge |
//! | `wemo` | Belkin Wemo switch, SOAP on the local network |
//! | `dry-run` | in-memory relay for development and tests |
//!
//! # Examples
//!
//! ```no_run
//! use puerta_door::{DoorController, adapters::{AdapterConfig, connect}};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let door = connect(&AdapterConfig::new("wemo").param("endpoint", "10.0.0.7"))?;
//! let controller = DoorController::new(door);
//!
//! controller.request_entry("alice").await?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod controller;
pub mod error;
pub mod signals;
pub mod traits;

pub use adapters::{AdapterConfig, AnyDoor, adapter_kinds, connect, hue, mock, wemo};
pub use controller::{ControllerConfig, DoorController, DoorState};
pub use error::{DoorError, EntryError, Result};
pub use traits::{AdapterInfo, DoorActuator};
