//! Door relay behind a Philips Hue bridge.
//!
//! The relay is wired as a Hue light: switching the light on opens the door.
//! The bridge speaks JSON over HTTP and requires a one-time pairing, done by
//! pressing the link button and then calling [`HueDoor::pair`], which
//! returns the username to put in the adapter parameters.
//!
//! Bridge errors come back as `200 OK` with a body like
//! `[{"error": {"type": 101, "description": "link button not pressed"}}]`.
//! Types 1 (unauthorized user) and 101 (link button not pressed) mean the
//! bridge needs pairing; anything else is a communication failure.

use std::time::Duration;

use puerta_core::constants::{DEFAULT_CALL_TIMEOUT_MS, DEFAULT_HOLD_MS};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{DoorError, Result};
use crate::signals::ActuationSignals;
use crate::traits::{AdapterInfo, DoorActuator};

const UNAUTHORIZED_USER: u64 = 1;
const LINK_BUTTON_NOT_PRESSED: u64 = 101;

/// Parameters accepted by the `hue` adapter kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HueConfig {
    /// Bridge address, `host[:port]` or a full `http://` URL.
    pub ip: String,

    /// Username obtained by pairing.
    #[serde(default)]
    pub username: Option<String>,

    /// Light id of the relay on the bridge.
    #[serde(default)]
    pub device: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_CALL_TIMEOUT_MS
}

fn default_hold_ms() -> u64 {
    DEFAULT_HOLD_MS
}

impl HueConfig {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            username: None,
            device: None,
            timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            hold_ms: DEFAULT_HOLD_MS,
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn hold_ms(mut self, hold_ms: u64) -> Self {
        self.hold_ms = hold_ms;
        self
    }
}

/// A light known to the bridge, as listed during setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HueLight {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub product: String,
}

#[derive(Debug)]
pub struct HueDoor {
    client: reqwest::Client,
    base: String,
    username: Option<String>,
    device: Option<String>,
    hold: Duration,
}

impl HueDoor {
    /// Build an adapter; no network traffic happens until first use.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: HueConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| DoorError::configuration(format!("hue client: {e}")))?;

        let base = if config.ip.contains("://") {
            config.ip.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", config.ip)
        };

        Ok(Self {
            client,
            base,
            username: config.username,
            device: config.device,
            hold: Duration::from_millis(config.hold_ms),
        })
    }

    fn username(&self) -> Result<&str> {
        self.username
            .as_deref()
            .ok_or_else(|| DoorError::pairing_required("no bridge username configured"))
    }

    fn light_url(&self) -> Result<String> {
        let username = self.username()?;
        let device = self
            .device
            .as_deref()
            .ok_or_else(|| DoorError::configuration("no hue device configured"))?;
        Ok(format!("{}/api/{}/lights/{}", self.base, username, device))
    }

    /// Register with the bridge. The link button must have been pressed.
    ///
    /// # Errors
    ///
    /// [`DoorError::PairingRequired`] if the link button was not pressed.
    pub async fn pair(&self, devicetype: &str) -> Result<String> {
        let body: Value = self
            .client
            .post(format!("{}/api", self.base))
            .json(&json!({ "devicetype": devicetype }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        bridge_error(&body)?;

        body.pointer("/0/success/username")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DoorError::protocol("pairing response has no username"))
    }

    /// Every light the bridge knows about, ordered by id.
    pub async fn lights(&self) -> Result<Vec<HueLight>> {
        let url = format!("{}/api/{}/lights", self.base, self.username()?);
        let body: Value = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        bridge_error(&body)?;

        let entries = body
            .as_object()
            .ok_or_else(|| DoorError::protocol("light list is not an object"))?;

        let field = |light: &Value, name: &str| {
            light
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let mut lights: Vec<HueLight> = entries
            .iter()
            .map(|(id, light)| HueLight {
                id: id.clone(),
                name: field(light, "name"),
                kind: field(light, "type"),
                product: field(light, "productname"),
            })
            .collect();
        lights.sort_by(|a, b| {
            a.id.parse::<u64>()
                .ok()
                .cmp(&b.id.parse::<u64>().ok())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(lights)
    }

    async fn set_on(&self, on: bool) -> Result<()> {
        let url = format!("{}/state", self.light_url()?);
        let body: Value = self
            .client
            .put(url)
            .json(&json!({ "on": on }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        bridge_error(&body)
    }
}

/// Turn the first bridge error in `body` into a [`DoorError`].
fn bridge_error(body: &Value) -> Result<()> {
    let Some(error) = body
        .as_array()
        .and_then(|items| items.iter().find_map(|item| item.get("error")))
    else {
        return Ok(());
    };

    let kind = error.get("type").and_then(Value::as_u64).unwrap_or_default();
    let description = error
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("unknown bridge error");

    Err(match kind {
        UNAUTHORIZED_USER | LINK_BUTTON_NOT_PRESSED => DoorError::pairing_required(description),
        _ => DoorError::communication(format!("bridge error {kind}: {description}")),
    })
}

impl DoorActuator for HueDoor {
    fn info(&self) -> AdapterInfo {
        AdapterInfo::new(
            "hue",
            format!("{} light {}", self.base, self.device.as_deref().unwrap_or("?")),
        )
    }

    async fn is_open(&self) -> Result<bool> {
        let body: Value = self
            .client
            .get(self.light_url()?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        bridge_error(&body)?;

        body.pointer("/state/on")
            .and_then(Value::as_bool)
            .ok_or_else(|| DoorError::protocol("light state has no 'on' field"))
    }

    async fn open(&self, signals: ActuationSignals) {
        if let Err(err) = self.set_on(true).await {
            signals.begin(Err(err));
            return;
        }
        let Some(completion) = signals.begin(Ok(())) else {
            return;
        };
        info!(hold_ms = self.hold.as_millis() as u64, "hue relay on");

        tokio::time::sleep(self.hold).await;

        let result = self.set_on(false).await;
        debug!(ok = result.is_ok(), "hue relay off");
        completion.complete(result);
    }
}
