use std::fmt;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use chrono::{DateTime, TimeDelta, Utc};
use puerta_core::constants::{LOGIN_CHALLENGE_KEY, REGISTER_CHALLENGE_KEY};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Which second-factor exchange a challenge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    Register,
    Login,
}

impl FlowKind {
    /// Ephemeral store key holding this flow's pending state.
    pub fn store_key(&self) -> &'static str {
        match self {
            FlowKind::Register => REGISTER_CHALLENGE_KEY,
            FlowKind::Login => LOGIN_CHALLENGE_KEY,
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowKind::Register => write!(f, "register"),
            FlowKind::Login => write!(f, "login"),
        }
    }
}

/// Server-side state of one flow, as kept in the ephemeral store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlowState {
    AwaitingResponse {
        flow: FlowKind,
        issued_at: DateTime<Utc>,
        /// Relying-party state needed to verify the response.
        state: Value,
    },
}

impl FlowState {
    pub fn awaiting(flow: FlowKind, state: Value) -> Self {
        Self::AwaitingResponse {
            flow,
            issued_at: Utc::now(),
            state,
        }
    }

    /// Relying-party state, if this is still a live challenge for `flow`.
    pub fn into_pending(self, flow: FlowKind, ttl: TimeDelta, now: DateTime<Utc>) -> Option<Value> {
        match self {
            FlowState::AwaitingResponse {
                flow: stored,
                issued_at,
                state,
            } if stored == flow && now - issued_at <= ttl => Some(state),
            FlowState::AwaitingResponse { .. } => None,
        }
    }
}

/// A challenge the browser must answer before the request can go on.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeIssued {
    pub flow: FlowKind,
    /// Options for `navigator.credentials.create()` or `.get()`.
    pub options: Value,
}

impl ChallengeIssued {
    /// JSON body: `{"webauthn": "<flow>", "data": <options>}`.
    pub fn body(&self) -> Value {
        json!({ "webauthn": self.flow, "data": self.options })
    }

    /// `webauthn` header value: the flow, a space, then the options as
    /// standard base64 JSON.
    pub fn header_value(&self) -> String {
        format!("{} {}", self.flow, BASE64_STANDARD.encode(self.options.to_string()))
    }
}

/// Result of the second-factor gate.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// The request may continue.
    Proceed,
    /// The request stops here and the challenge goes back to the browser.
    Challenge(ChallengeIssued),
}

impl GateOutcome {
    pub fn is_proceed(&self) -> bool {
        matches!(self, GateOutcome::Proceed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_kind_wire_names() {
        assert_eq!(serde_json::to_value(FlowKind::Register).unwrap(), "register");
        assert_eq!(FlowKind::Login.to_string(), "login");
        assert_eq!(FlowKind::Login.store_key(), "wan-auth");
        assert_eq!(FlowKind::Register.store_key(), "wan-register");
    }

    #[test]
    fn test_challenge_body_and_header() {
        let challenge = ChallengeIssued {
            flow: FlowKind::Login,
            options: json!({"publicKey": {"challenge": "abc"}}),
        };

        assert_eq!(
            challenge.body(),
            json!({"webauthn": "login", "data": {"publicKey": {"challenge": "abc"}}})
        );

        let header = challenge.header_value();
        let (flow, encoded) = header.split_once(' ').unwrap();
        assert_eq!(flow, "login");
        let decoded: Value =
            serde_json::from_slice(&BASE64_STANDARD.decode(encoded).unwrap()).unwrap();
        assert_eq!(decoded, challenge.options);
    }

    #[test]
    fn test_pending_state_checks_flow_and_age() {
        let ttl = TimeDelta::minutes(5);
        let state = FlowState::awaiting(FlowKind::Register, json!({"s": 1}));
        let now = Utc::now();

        assert_eq!(
            state.clone().into_pending(FlowKind::Register, ttl, now),
            Some(json!({"s": 1}))
        );
        assert_eq!(state.clone().into_pending(FlowKind::Login, ttl, now), None);
        assert_eq!(
            state.into_pending(FlowKind::Register, ttl, now + TimeDelta::minutes(6)),
            None
        );
    }

    #[test]
    fn test_flow_state_serialization() {
        let state = FlowState::awaiting(FlowKind::Login, json!(null));
        let encoded = serde_json::to_value(&state).unwrap();

        assert_eq!(encoded["status"], "awaiting_response");
        assert_eq!(encoded["flow"], "login");
        assert_eq!(serde_json::from_value::<FlowState>(encoded).unwrap(), state);
    }
}
