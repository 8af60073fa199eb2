pub mod audit_log;
pub mod credential;
pub mod session;
pub mod user;

pub use audit_log::{AuditLogRepository, SqliteAuditLogRepository};
pub use credential::{CredentialRepository, SqliteCredentialRepository};
pub use session::{SessionRepository, SqliteSessionRepository};
pub use user::{SqliteUserRepository, UserRepository};
