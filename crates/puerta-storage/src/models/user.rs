use chrono::{DateTime, Utc};
use puerta_core::{AccessWindow, Schedule, Ttl};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// A person allowed to request entry.
///
/// # Fields
///
/// * `id` - Auto-increment primary key
/// * `handle` - Unique login name
/// * `name` - Display name
/// * `password` - Argon2 PHC string, never the plain password
/// * `greeting` - Text shown after a successful login
/// * `schedule` - Optional weekly window outside which entry is denied
/// * `expires` - Optional instant after which the user is refused
/// * `ttl` - Lifetime of each login session (`30d` unless set)
/// * `is_admin` - May read the audit log
/// * `require_2fa` - Entry needs a WebAuthn step-up
///
/// The schedule and TTL are stored as the text the administrator wrote and
/// parsed on load, so a row with a malformed value fails to decode instead
/// of silently granting access.
///
/// # Examples
///
/// ```
/// use puerta_core::AccessWindow;
/// use puerta_storage::models::User;
///
/// let user = User::new("alice", "Alice", "$argon2id$...")
///     .with_schedule("days=1-5 hours=9-17".parse().unwrap());
///
/// assert_eq!(user.ttl.seconds(), 30 * 24 * 60 * 60);
/// assert!(user.schedule().is_some());
/// assert!(user.expires().is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub handle: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub greeting: String,
    pub schedule: Option<Schedule>,
    pub expires: Option<DateTime<Utc>>,
    pub ttl: Ttl,
    pub is_admin: bool,
    pub require_2fa: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A user that is not stored yet (`id` is 0 until created).
    pub fn new(
        handle: impl Into<String>,
        name: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            handle: handle.into(),
            name: name.into(),
            password: password_hash.into(),
            greeting: String::new(),
            schedule: None,
            expires: None,
            ttl: Ttl::default(),
            is_admin: false,
            require_2fa: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn with_expiry(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    pub fn with_2fa(mut self, required: bool) -> Self {
        self.require_2fa = required;
        self
    }
}

impl AccessWindow for User {
    fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }
}

fn decode_error(column: &str, source: puerta_core::Error) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

impl<'r> FromRow<'r, SqliteRow> for User {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let schedule = match row.try_get::<Option<String>, _>("schedule")? {
            Some(source) if !source.trim().is_empty() => {
                Some(source.parse().map_err(|e| decode_error("schedule", e))?)
            }
            _ => None,
        };

        let mut ttl = Ttl::default();
        ttl.apply(row.try_get::<&str, _>("ttl")?)
            .map_err(|e| decode_error("ttl", e))?;

        Ok(Self {
            id: row.try_get("id")?,
            handle: row.try_get("handle")?,
            name: row.try_get("name")?,
            password: row.try_get("password")?,
            greeting: row.try_get("greeting")?,
            schedule,
            expires: row.try_get("expires")?,
            ttl,
            is_admin: row.try_get("is_admin")?,
            require_2fa: row.try_get("require_2fa")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
