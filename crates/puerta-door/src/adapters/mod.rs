//! Door adapters and the registry that builds them from configuration.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn DoorActuator>`
//! is not an option. [`AnyDoor`] wraps every adapter in an enum and
//! forwards the trait calls, and [`connect`] picks the variant by the
//! configured `kind` key.
//!
//! # Examples
//!
//! ```
//! use puerta_door::adapters::{AdapterConfig, connect};
//!
//! let config: AdapterConfig = serde_json::from_value(serde_json::json!({
//!     "kind": "wemo",
//!     "endpoint": "10.0.0.7",
//! }))
//! .unwrap();
//!
//! let door = connect(&config).unwrap();
//! assert_eq!(door.kind(), "wemo");
//! ```

pub mod hue;
pub mod mock;
pub mod wemo;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DoorError, Result};
use crate::signals::ActuationSignals;
use crate::traits::{AdapterInfo, DoorActuator};
use hue::{HueConfig, HueDoor};
use mock::{MockDoor, MockDoorConfig};
use wemo::{WemoConfig, WemoDoor};

/// Adapter selection as written in the configuration file.
///
/// Everything besides `kind` is handed to the adapter as parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub kind: String,

    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl AdapterConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Map::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.params.clone())).map_err(|e| {
            DoorError::configuration(format!("invalid {} parameters: {e}", self.kind))
        })
    }
}

/// Enum wrapper for door adapter dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyDoor {
    Hue(HueDoor),
    Wemo(WemoDoor),
    /// In-memory door for development and testing.
    DryRun(MockDoor),
}

impl AnyDoor {
    /// Registry key of the wrapped adapter.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hue(_) => "hue",
            Self::Wemo(_) => "wemo",
            Self::DryRun(_) => "dry-run",
        }
    }
}

impl DoorActuator for AnyDoor {
    fn info(&self) -> AdapterInfo {
        match self {
            Self::Hue(door) => door.info(),
            Self::Wemo(door) => door.info(),
            Self::DryRun(door) => door.info(),
        }
    }

    async fn is_open(&self) -> Result<bool> {
        match self {
            Self::Hue(door) => door.is_open().await,
            Self::Wemo(door) => door.is_open().await,
            Self::DryRun(door) => door.is_open().await,
        }
    }

    async fn open(&self, signals: ActuationSignals) {
        match self {
            Self::Hue(door) => door.open(signals).await,
            Self::Wemo(door) => door.open(signals).await,
            Self::DryRun(door) => door.open(signals).await,
        }
    }
}

impl From<MockDoor> for AnyDoor {
    fn from(door: MockDoor) -> Self {
        Self::DryRun(door)
    }
}

type Constructor = fn(&AdapterConfig) -> Result<AnyDoor>;

/// Named constructors, in the order they are listed in error messages.
const REGISTRY: &[(&str, Constructor)] = &[
    ("hue", connect_hue),
    ("wemo", connect_wemo),
    ("dry-run", connect_dry_run),
];

fn connect_hue(config: &AdapterConfig) -> Result<AnyDoor> {
    Ok(AnyDoor::Hue(HueDoor::new(config.parse::<HueConfig>()?)?))
}

fn connect_wemo(config: &AdapterConfig) -> Result<AnyDoor> {
    Ok(AnyDoor::Wemo(WemoDoor::new(config.parse::<WemoConfig>()?)?))
}

fn connect_dry_run(config: &AdapterConfig) -> Result<AnyDoor> {
    let (door, _handle) = MockDoor::with_config(config.parse::<MockDoorConfig>()?);
    Ok(AnyDoor::DryRun(door))
}

/// Adapter kinds [`connect`] understands.
pub fn adapter_kinds() -> Vec<&'static str> {
    REGISTRY.iter().map(|(kind, _)| *kind).collect()
}

/// Build the adapter named by `config.kind`.
///
/// # Errors
///
/// [`DoorError::UnknownAdapter`] for an unregistered kind, or a
/// configuration error if the parameters do not fit the adapter.
pub fn connect(config: &AdapterConfig) -> Result<AnyDoor> {
    let (_, constructor) = REGISTRY
        .iter()
        .find(|(kind, _)| *kind == config.kind)
        .ok_or_else(|| DoorError::UnknownAdapter {
            kind: config.kind.clone(),
            known: adapter_kinds(),
        })?;
    constructor(config)
}
