//! Login and logout.

use axum::Form;
use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use puerta_auth::cookie::{clear_session_cookie, session_cookie};
use puerta_auth::login::authenticate;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub user: String,
    pub password: String,
    /// `"true"` when the page logs in with `fetch` and wants the greeting.
    #[serde(default, rename = "async")]
    pub fetch: Option<String>,
}

/// `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let user = authenticate(&state.users, &form.user, &form.password).await?;
    let issued = state.sessions.create_session(&user).await?;
    info!(user = %user.handle, expires = %issued.expires, "logged in");

    let cookie = [(
        header::SET_COOKIE,
        session_cookie(&issued.token, issued.max_age, state.secure_cookies),
    )];

    if form.fetch.as_deref() == Some("true") {
        Ok((cookie, user.greeting).into_response())
    } else {
        Ok((cookie, Redirect::to("/")).into_response())
    }
}

/// `POST /api/logout`
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, ApiError> {
    state.sessions.invalidate(&current.token).await?;
    info!(user = %current.user.handle, "logged out");

    Ok((
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({ "status": "ok" })),
    )
        .into_response())
}
