//! `POST /api/rex`: request to enter.
//!
//! Session, access policy, second factor, then the door. Every attempt
//! that gets past the session check lands in the audit log, except a
//! second-factor challenge, which only asks the browser to try again.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use puerta_auth::{ChallengeIssued, GateOutcome};
use puerta_core::constants::WEBAUTHN_HEADER;
use puerta_storage::{AuditLog, AuditLogRepository};
use serde_json::json;
use tower_sessions::Session;
use tracing::{error, info, warn};

use crate::browser_session::BrowserSession;
use crate::error::ApiError;
use crate::extract::{ClientInfo, CurrentUser};
use crate::state::AppState;

async fn record(state: &AppState, entry: AuditLog) {
    if let Err(err) = state.audit.append(&entry).await {
        error!(user = %entry.user_handle, error = %err, "could not record audit log entry");
    }
}

/// Challenge sent back as a regular 200 so the page can answer it and retry.
fn challenge_response(challenge: &ChallengeIssued) -> Response {
    (
        [(WEBAUTHN_HEADER, challenge.header_value())],
        Json(challenge.body()),
    )
        .into_response()
}

pub async fn rex(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    client: ClientInfo,
    session: Session,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let entry = AuditLog::new(&user.handle)
        .second_factor(user.require_2fa)
        .client(client.ip_address, client.user_agent);

    if let Err(denial) = state.policy.check(&user, Utc::now()) {
        warn!(user = %user.handle, reason = %denial, "entry denied");
        record(&state, entry.failure(denial.kind(), denial.to_string())).await;
        return Err(denial.into());
    }

    let response = headers
        .get(WEBAUTHN_HEADER)
        .and_then(|value| value.to_str().ok());
    match state
        .second_factor
        .enforce(&BrowserSession(session), &user, response)
        .await
    {
        Ok(GateOutcome::Proceed) => {}
        Ok(GateOutcome::Challenge(challenge)) => {
            info!(user = %user.handle, flow = %challenge.flow, "second factor challenge issued");
            return Ok(challenge_response(&challenge));
        }
        Err(err) => {
            record(&state, entry.failure("second_factor", err.to_string())).await;
            return Err(err.into());
        }
    }

    match state.door.request_entry(&user.handle).await {
        Ok(()) => {
            record(&state, entry).await;
            Ok(Json(json!({ "status": "ok" })).into_response())
        }
        Err(err) => {
            record(&state, entry.failure(err.kind(), err.to_string())).await;
            Err(err.into())
        }
    }
}
