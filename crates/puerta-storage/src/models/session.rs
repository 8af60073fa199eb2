use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::User;

/// A login session, addressed by its opaque token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub expires: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>, user_id: i64, expires: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            user_id,
            expires,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

/// A session joined with the user it belongs to.
///
/// Decoded from a row carrying the user columns under their own names and
/// the session columns prefixed with `session_`.
#[derive(Debug, Clone)]
pub struct SessionWithUser {
    pub session: Session,
    pub user: User,
}

impl<'r> FromRow<'r, SqliteRow> for SessionWithUser {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let user = User::from_row(row)?;
        let session = Session {
            token: row.try_get("session_token")?,
            user_id: user.id,
            expires: row.try_get("session_expires")?,
            created_at: row.try_get("session_created_at")?,
        };
        Ok(Self { session, user })
    }
}
