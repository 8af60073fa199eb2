//! `POST /api/webauthn/register`: answer to a registration challenge.

use axum::Json;
use axum::extract::State;
use puerta_auth::SecondFactorError;
use serde_json::{Value, json};
use tower_sessions::Session;

use crate::browser_session::BrowserSession;
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    session: Session,
    Json(response): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    if !user.require_2fa {
        return Err(SecondFactorError::NotRequired.into());
    }

    state
        .second_factor
        .finish_registration(&BrowserSession(session), &user, &response)
        .await?;

    Ok(Json(json!({ "status": "ok" })))
}
