//! Login sessions.
//!
//! A session is an opaque token bound to one user with an absolute expiry
//! of creation time plus the user's TTL. Creating a session replaces every
//! earlier session of the same user.

use chrono::{DateTime, Utc};
use puerta_storage::{Session, SessionRepository, User};
use tracing::{debug, warn};

use crate::error::{AuthError, Result};
use crate::token::new_token;

/// A freshly created session as handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub expires: DateTime<Utc>,
    /// Lifetime in seconds, for the cookie `Max-Age`.
    pub max_age: u64,
}

/// Creates, resolves and ends sessions over a [`SessionRepository`].
#[derive(Debug, Clone)]
pub struct SessionManager<S> {
    sessions: S,
}

impl<S: SessionRepository> SessionManager<S> {
    pub fn new(sessions: S) -> Self {
        Self { sessions }
    }

    /// Start a session for `user`, ending any other session they hold.
    pub async fn create_session(&self, user: &User) -> Result<IssuedSession> {
        let now = Utc::now();
        let expires = user.ttl.expiry_from(now).ok_or(AuthError::TtlOutOfRange {
            seconds: user.ttl.seconds(),
        })?;

        let session = Session::new(new_token(), user.id, expires);
        self.sessions.create_replacing(&session).await?;
        debug!(user = %user.handle, %expires, "session created");

        Ok(IssuedSession {
            token: session.token,
            expires,
            max_age: user.ttl.seconds(),
        })
    }

    /// The user behind `token`.
    ///
    /// An expired session is deleted on the way out. A session whose user
    /// has expired counts as expired too.
    ///
    /// # Errors
    ///
    /// [`AuthError::SessionNotFound`] or [`AuthError::SessionExpired`].
    pub async fn resolve(&self, token: &str) -> Result<User> {
        let Some(found) = self.sessions.find_with_user(token).await? else {
            return Err(AuthError::SessionNotFound);
        };

        let now = Utc::now();
        let user_expired = found.user.expires.is_some_and(|expires| expires < now);
        if found.session.is_expired_at(now) || user_expired {
            debug!(user = %found.user.handle, user_expired, "expired session presented");
            if let Err(err) = self.sessions.delete(token).await {
                warn!(error = %err, "could not delete expired session");
            }
            return Err(AuthError::SessionExpired);
        }

        Ok(found.user)
    }

    /// End the session behind `token`. Unknown tokens are ignored.
    pub async fn invalidate(&self, token: &str) -> Result<()> {
        self.sessions.delete(token).await?;
        Ok(())
    }

    /// Delete every expired session, returning how many were removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        Ok(self.sessions.delete_expired(Utc::now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use puerta_core::Ttl;
    use puerta_storage::{Database, SqliteSessionRepository, SqliteUserRepository, UserRepository};

    async fn setup(user: User) -> (SessionManager<SqliteSessionRepository>, User, Database) {
        let db = Database::in_memory().await.unwrap();
        let users = SqliteUserRepository::new(db.pool().clone());
        let id = users.create(&user).await.unwrap();
        let user = users.find_by_id(id).await.unwrap().unwrap();
        (
            SessionManager::new(SqliteSessionRepository::new(db.pool().clone())),
            user,
            db,
        )
    }

    #[tokio::test]
    async fn test_create_and_resolve() {
        let (manager, user, _db) = setup(User::new("alice", "Alice", "hash")).await;

        let issued = manager.create_session(&user).await.unwrap();

        assert_eq!(issued.token.len(), 32);
        assert_eq!(issued.max_age, 30 * 24 * 60 * 60);
        assert_eq!(manager.resolve(&issued.token).await.unwrap().handle, "alice");
    }

    #[tokio::test]
    async fn test_second_session_replaces_first() {
        let (manager, user, _db) = setup(User::new("alice", "Alice", "hash")).await;

        let first = manager.create_session(&user).await.unwrap();
        let second = manager.create_session(&user).await.unwrap();

        assert!(matches!(
            manager.resolve(&first.token).await,
            Err(AuthError::SessionNotFound)
        ));
        assert!(manager.resolve(&second.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_session_is_deleted() {
        let (manager, user, _db) =
            setup(User::new("alice", "Alice", "hash").with_ttl(Ttl::from_seconds(0))).await;

        let issued = manager.create_session(&user).await.unwrap();

        assert!(matches!(
            manager.resolve(&issued.token).await,
            Err(AuthError::SessionExpired)
        ));
        assert!(matches!(
            manager.resolve(&issued.token).await,
            Err(AuthError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_expired_user_invalidates_session() {
        let (manager, user, _db) = setup(
            User::new("alice", "Alice", "hash").with_expiry(Utc::now() - TimeDelta::minutes(1)),
        )
        .await;

        let issued = manager.create_session(&user).await.unwrap();

        assert!(matches!(
            manager.resolve(&issued.token).await,
            Err(AuthError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn test_invalidate() {
        let (manager, user, _db) = setup(User::new("alice", "Alice", "hash")).await;
        let issued = manager.create_session(&user).await.unwrap();

        manager.invalidate(&issued.token).await.unwrap();
        manager.invalidate(&issued.token).await.unwrap();

        assert!(matches!(
            manager.resolve(&issued.token).await,
            Err(AuthError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (manager, user, _db) =
            setup(User::new("alice", "Alice", "hash").with_ttl(Ttl::from_seconds(0))).await;
        manager.create_session(&user).await.unwrap();

        assert_eq!(manager.purge_expired().await.unwrap(), 1);
        assert_eq!(manager.purge_expired().await.unwrap(), 0);
    }
}
