//! Identity for puerta: who is asking, and have they proven it.
//!
//! - [`login::authenticate`]: handle and password against the user store
//! - [`SessionManager`]: opaque session tokens, one live session per user
//! - [`cookie`]: the `_puerta` cookie carrying the token
//! - [`webauthn::SecondFactor`]: WebAuthn registration and step-up login,
//!   with pending challenges kept in an [`EphemeralStore`]
//!
//! # Examples
//!
//! ```no_run
//! use puerta_auth::{SessionManager, login};
//! use puerta_storage::{Database, SqliteSessionRepository, SqliteUserRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::in_memory().await?;
//! let users = SqliteUserRepository::new(db.pool().clone());
//! let sessions = SessionManager::new(SqliteSessionRepository::new(db.pool().clone()));
//!
//! let user = login::authenticate(&users, "alice", "hunter2").await?;
//! let issued = sessions.create_session(&user).await?;
//! assert_eq!(sessions.resolve(&issued.token).await?.handle, "alice");
//! # Ok(())
//! # }
//! ```

pub mod cookie;
pub mod ephemeral;
pub mod error;
pub mod login;
pub mod password;
pub mod session;
pub mod token;
pub mod webauthn;

pub use ephemeral::{EphemeralStore, MemoryEphemeralStore};
pub use error::{AuthError, Result, SecondFactorError, StoreError};
pub use password::{hash_password, verify_password};
pub use session::{IssuedSession, SessionManager};
pub use webauthn::{ChallengeIssued, FlowKind, GateOutcome, SecondFactor, WebauthnRelyingParty};
