//! HTTP error mapping.
//!
//! Every handler returns `Result<_, ApiError>`. The response body is always
//! `{"error": "<message>"}`; internal details only go to the log.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use puerta_auth::cookie::clear_session_cookie;
use puerta_auth::{AuthError, SecondFactorError};
use puerta_core::Denial;
use puerta_door::EntryError;
use puerta_storage::StorageError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Login failed, for whatever reason.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No usable session cookie.
    #[error("Not logged in")]
    SessionInvalid,

    #[error("Admin access required")]
    AdminRequired,

    #[error(transparent)]
    Denied(#[from] Denial),

    #[error(transparent)]
    Entry(#[from] EntryError),

    #[error(transparent)]
    SecondFactor(#[from] SecondFactorError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::Denied(_) => StatusCode::FORBIDDEN,
            Self::SessionInvalid | Self::AdminRequired => StatusCode::UNAUTHORIZED,
            Self::Entry(EntryError::DoorBusy) => StatusCode::CONFLICT,
            Self::Entry(EntryError::AlreadyOpen) => StatusCode::PRECONDITION_FAILED,
            Self::Entry(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SecondFactor(err) if err.is_bad_request() => StatusCode::BAD_REQUEST,
            Self::SecondFactor(SecondFactorError::Rejected { .. }) => StatusCode::UNAUTHORIZED,
            Self::SecondFactor(SecondFactorError::NotRequired) => StatusCode::CONFLICT,
            Self::SecondFactor(_) | Self::Storage(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the caller.
    fn public_message(&self) -> String {
        match self {
            Self::Denied(_) => "Access denied".to_string(),
            Self::Entry(EntryError::Communication(_)) => "Could not reach the door".to_string(),
            Self::SecondFactor(SecondFactorError::Rejected { .. }) => {
                "Second factor rejected".to_string()
            }
            Self::Storage(_) | Self::Internal(_) => "Internal error".to_string(),
            Self::SecondFactor(err)
                if !err.is_bad_request() && !matches!(err, SecondFactorError::NotRequired) =>
            {
                "Internal error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials { .. } => Self::InvalidCredentials,
            AuthError::SessionNotFound | AuthError::SessionExpired => Self::SessionInvalid,
            AuthError::Storage(err) => Self::Storage(err),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let mut response = (status, Json(json!({ "error": self.public_message() }))).into_response();
        if matches!(self, Self::SessionInvalid)
            && let Ok(value) = HeaderValue::from_str(&clear_session_cookie())
        {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
        response
    }
}
