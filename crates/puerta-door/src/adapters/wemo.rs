//! Door relay on a Belkin Wemo switch.
//!
//! Wemo devices expose a UPnP `basicevent` service over SOAP on port 49153.
//! Two actions are used: `GetBinaryState` to read the relay and
//! `SetBinaryState` to switch it.

use std::time::Duration;

use puerta_core::constants::{DEFAULT_CALL_TIMEOUT_MS, DEFAULT_HOLD_MS};
use reqwest::header::{CONTENT_TYPE, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DoorError, Result};
use crate::signals::ActuationSignals;
use crate::traits::{AdapterInfo, DoorActuator};

pub const DEFAULT_PORT: u16 = 49153;
const CONTROL_PATH: &str = "/upnp/control/basicevent1";
const SERVICE: &str = "urn:Belkin:service:basicevent:1";

/// Parameters accepted by the `wemo` adapter kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WemoConfig {
    /// Host name or address of the switch.
    pub endpoint: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_ms() -> u64 {
    DEFAULT_CALL_TIMEOUT_MS
}

fn default_hold_ms() -> u64 {
    DEFAULT_HOLD_MS
}

impl WemoConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            port: DEFAULT_PORT,
            timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            hold_ms: DEFAULT_HOLD_MS,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn hold_ms(mut self, hold_ms: u64) -> Self {
        self.hold_ms = hold_ms;
        self
    }
}

#[derive(Debug)]
pub struct WemoDoor {
    client: reqwest::Client,
    url: String,
    hold: Duration,
}

impl WemoDoor {
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: WemoConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| DoorError::configuration(format!("wemo client: {e}")))?;

        Ok(Self {
            client,
            url: format!("http://{}:{}{}", config.endpoint, config.port, CONTROL_PATH),
            hold: Duration::from_millis(config.hold_ms),
        })
    }

    async fn call(&self, action: &str, arguments: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .header("SOAPACTION", format!("\"{SERVICE}#{action}\""))
            .header(CONTENT_TYPE, HeaderValue::from_static("text/xml; charset=\"utf-8\""))
            .header(USER_AGENT, concat!("puerta/", env!("CARGO_PKG_VERSION")))
            .body(envelope(action, arguments))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DoorError::communication(format!(
                "{action} returned {status}"
            )));
        }
        Ok(response.text().await?)
    }

    async fn set_state(&self, on: bool) -> Result<()> {
        let arguments = format!("<BinaryState>{}</BinaryState>", u8::from(on));
        self.call("SetBinaryState", &arguments).await.map(drop)
    }
}

fn envelope(action: &str, arguments: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" "#,
            r#"s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">"#,
            r#"<s:Body><u:{action} xmlns:u="{service}">{arguments}</u:{action}></s:Body>"#,
            r#"</s:Envelope>"#,
        ),
        action = action,
        service = SERVICE,
        arguments = arguments,
    )
}

/// Read the relay state out of a `GetBinaryStateResponse`.
///
/// Newer firmware appends `|timestamp|...` after the state digit, so only
/// the first character after the tag is significant.
fn parse_binary_state(body: &str) -> Result<bool> {
    const TAG: &str = "<BinaryState>";

    let start = body
        .find(TAG)
        .ok_or_else(|| DoorError::protocol("response has no BinaryState"))?;
    match body[start + TAG.len()..].chars().next() {
        Some('1') => Ok(true),
        Some('0') => Ok(false),
        _ => Err(DoorError::protocol(format!(
            "unknown BinaryState in response: {body}"
        ))),
    }
}

impl DoorActuator for WemoDoor {
    fn info(&self) -> AdapterInfo {
        AdapterInfo::new("wemo", self.url.clone())
    }

    async fn is_open(&self) -> Result<bool> {
        let body = self.call("GetBinaryState", "").await?;
        parse_binary_state(&body)
    }

    async fn open(&self, signals: ActuationSignals) {
        if let Err(err) = self.set_state(true).await {
            signals.begin(Err(err));
            return;
        }
        let Some(completion) = signals.begin(Ok(())) else {
            return;
        };
        info!(hold_ms = self.hold.as_millis() as u64, "wemo relay on");

        tokio::time::sleep(self.hold).await;

        let result = self.set_state(false).await;
        debug!(ok = result.is_ok(), "wemo relay off");
        completion.complete(result);
    }
}
