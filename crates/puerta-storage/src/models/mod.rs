pub mod audit_log;
pub mod credential;
pub mod session;
pub mod user;

pub use audit_log::AuditLog;
pub use credential::Credential;
pub use session::{Session, SessionWithUser};
pub use user::User;
