use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An enrolled WebAuthn authenticator.
///
/// `passkey` holds the serialized authenticator record exactly as the
/// relying party produced it; storage never looks inside. Credentials are
/// never updated, only created and removed together with their user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Credential {
    pub id: i64,
    pub user_id: i64,
    pub credential_id: String,
    pub passkey: String,
    pub created_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(user_id: i64, credential_id: impl Into<String>, passkey: impl Into<String>) -> Self {
        Self {
            id: 0,
            user_id,
            credential_id: credential_id.into(),
            passkey: passkey.into(),
            created_at: Utc::now(),
        }
    }
}
