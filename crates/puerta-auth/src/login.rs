//! Password login.

use chrono::Utc;
use puerta_storage::{User, UserRepository};
use tracing::{debug, info};

use crate::error::{AuthError, Result};
use crate::password::verify_password;

/// Check a handle and password pair.
///
/// Every failure is reported as the same [`AuthError::InvalidCredentials`];
/// the specific reason is logged only.
pub async fn authenticate<U: UserRepository>(
    users: &U,
    handle: &str,
    password: &str,
) -> Result<User> {
    let Some(user) = users.find_by_handle(handle).await? else {
        debug!(user = handle, "login for unknown handle");
        return Err(AuthError::invalid_credentials("unknown handle"));
    };

    if !verify_password(password, &user.password) {
        info!(user = handle, "login with wrong password");
        return Err(AuthError::invalid_credentials("wrong password"));
    }

    if let Some(expires) = user.expires
        && expires < Utc::now()
    {
        info!(user = handle, %expires, "login by expired user");
        return Err(AuthError::invalid_credentials("user expired"));
    }

    Ok(user)
}
