use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry attempt, successful or not.
///
/// `failure` carries a stable kind (`door_busy`, `schedule_denied`, ...)
/// and is `None` for a granted entry. Entries are append-only.
///
/// # Examples
///
/// ```
/// use puerta_storage::models::AuditLog;
///
/// let entry = AuditLog::new("alice")
///     .second_factor(true)
///     .failure("door_busy", "door is busy")
///     .client("10.0.0.12", "curl/8.5");
///
/// assert!(!entry.is_success());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub user_handle: String,
    pub second_factor: bool,
    pub failure: Option<String>,
    pub error: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
}

impl AuditLog {
    pub fn new(user_handle: impl Into<String>) -> Self {
        Self {
            id: 0,
            timestamp: Utc::now(),
            user_handle: user_handle.into(),
            second_factor: false,
            failure: None,
            error: None,
            ip_address: String::new(),
            user_agent: String::new(),
        }
    }

    pub fn second_factor(mut self, used: bool) -> Self {
        self.second_factor = used;
        self
    }

    pub fn failure(mut self, kind: impl Into<String>, error: impl Into<String>) -> Self {
        self.failure = Some(kind.into());
        self.error = Some(error.into());
        self
    }

    pub fn client(mut self, ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        self.ip_address = ip_address.into();
        self.user_agent = user_agent.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}
