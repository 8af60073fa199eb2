//! Service configuration, read from a TOML file.
//!
//! ```toml
//! name = "Front door"
//! timezone = "America/Mexico_City"
//! db = "/var/lib/puerta/puerta.db"
//!
//! [http]
//! listen = "0.0.0.0:8000"
//! origin = "door.example.com"
//! protocol = "https"
//!
//! [adapter]
//! kind = "wemo"
//! endpoint = "10.0.0.7"
//!
//! [door]
//! max_cycle_secs = 15
//! ```
//!
//! Every key has a default. Without an `[adapter]` table the in-memory
//! `dry-run` door is used.

use std::path::{Path, PathBuf};
use std::time::Duration;

use puerta_core::AccessPolicy;
use puerta_core::constants::DEFAULT_MAX_CYCLE_MS;
use puerta_door::{AdapterConfig, ControllerConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Address the server binds to.
    pub listen: String,
    /// Public host, with a port when it is not the protocol default.
    pub origin: String,
    /// `http` or `https`.
    pub protocol: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: "localhost:8000".to_string(),
            origin: "localhost".to_string(),
            protocol: "http".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorSettings {
    /// Seconds after which an actuation that never reported relock is
    /// given up on.
    pub max_cycle_secs: u64,
}

impl Default for DoorSettings {
    fn default() -> Self {
        Self {
            max_cycle_secs: Duration::from_millis(DEFAULT_MAX_CYCLE_MS).as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display name shown by authenticators.
    pub name: String,
    /// IANA time zone schedules are evaluated in.
    pub timezone: String,
    /// Path of the SQLite database.
    pub db: String,
    pub http: HttpConfig,
    pub adapter: AdapterConfig,
    pub door: DoorSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "puerta".to_string(),
            timezone: "UTC".to_string(),
            db: "puerta.db".to_string(),
            http: HttpConfig::default(),
            adapter: AdapterConfig::new("dry-run"),
            door: DoorSettings::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.http.protocol.as_str(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "http.protocol must be http or https, got {:?}",
                self.http.protocol
            )));
        }
        if self.http.origin.is_empty() {
            return Err(ConfigError::Invalid("http.origin is empty".to_string()));
        }
        if self.door.max_cycle_secs == 0 {
            return Err(ConfigError::Invalid("door.max_cycle_secs must be positive".to_string()));
        }
        self.policy()?;
        Ok(())
    }

    /// Origin browsers are expected to send, `protocol://origin`.
    pub fn public_origin(&self) -> String {
        format!("{}://{}", self.http.protocol, self.http.origin)
    }

    /// WebAuthn relying-party id: the origin host without its port.
    pub fn rp_id(&self) -> &str {
        match self.http.origin.rsplit_once(':') {
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
            _ => &self.http.origin,
        }
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.http.protocol == "https"
    }

    pub fn policy(&self) -> Result<AccessPolicy, ConfigError> {
        AccessPolicy::with_timezone_name(&self.timezone)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn controller(&self) -> ControllerConfig {
        ControllerConfig::default().max_cycle(Duration::from_secs(self.door.max_cycle_secs))
    }
}
