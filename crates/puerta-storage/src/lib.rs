//! Durable storage for puerta.
//!
//! SQLite-backed persistence for users, WebAuthn credentials, login sessions
//! and the entry audit log.
//!
//! # Architecture
//!
//! - [`Database`] - connection pool manager with embedded migrations
//! - [`UserRepository`], [`CredentialRepository`], [`SessionRepository`],
//!   [`AuditLogRepository`] - data access traits with SQLite implementations
//!
//! Repository traits use native `async fn`, so callers are generic over the
//! repository rather than holding trait objects. That keeps the session and
//! second-factor logic in `puerta-auth` testable against any store.
//!
//! ## Sessions
//!
//! A user has at most one session. [`SessionRepository::create_replacing`]
//! deletes the older sessions and inserts the new one in a single
//! transaction, so two logins racing each other leave exactly one session.
//!
//! # Examples
//!
//! ```no_run
//! use puerta_storage::{Database, SqliteUserRepository, UserRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::open("puerta.db").await?;
//! let users = SqliteUserRepository::new(db.pool().clone());
//!
//! if let Some(user) = users.find_by_handle("alice").await? {
//!     println!("{} ({})", user.name, user.ttl);
//! }
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;

pub use connection::Database;
pub use error::{StorageError, StorageResult};
pub use models::{AuditLog, Credential, Session, SessionWithUser, User};
pub use repositories::{
    AuditLogRepository, CredentialRepository, SessionRepository, SqliteAuditLogRepository,
    SqliteCredentialRepository, SqliteSessionRepository, SqliteUserRepository, UserRepository,
};
