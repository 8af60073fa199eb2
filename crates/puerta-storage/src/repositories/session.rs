#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::{Session, SessionWithUser};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

/// Repository trait for login sessions
///
/// A user holds at most one session: [`create_replacing`] removes every
/// older session of the same user in the same transaction as the insert.
///
/// [`create_replacing`]: SessionRepository::create_replacing
pub trait SessionRepository: Send + Sync {
    /// Store `session`, deleting all other sessions of its user
    async fn create_replacing(&self, session: &Session) -> StorageResult<()>;

    /// Look up a session by token together with its user
    async fn find_with_user(&self, token: &str) -> StorageResult<Option<SessionWithUser>>;

    /// Delete one session; deleting an unknown token is not an error
    async fn delete(&self, token: &str) -> StorageResult<()>;

    /// Delete every session that expired at or before `now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> StorageResult<u64>;
}

/// SQLite implementation of SessionRepository
#[derive(Debug, Clone)]
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl SessionRepository for SqliteSessionRepository {
    async fn create_replacing(&self, session: &Session) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        let replaced = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(session.user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, expires, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.expires)
        .bind(session.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if replaced > 0 {
            debug!(user_id = session.user_id, replaced, "previous sessions replaced");
        }
        Ok(())
    }

    async fn find_with_user(&self, token: &str) -> StorageResult<Option<SessionWithUser>> {
        let found = sqlx::query_as::<_, SessionWithUser>(
            r#"
            SELECT u.id, u.handle, u.name, u.password, u.greeting,
                   u.schedule, u.expires, u.ttl, u.is_admin, u.require_2fa,
                   u.created_at,
                   s.token AS session_token,
                   s.expires AS session_expires,
                   s.created_at AS session_created_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found)
    }

    async fn delete(&self, token: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StorageResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::repositories::{SqliteUserRepository, UserRepository};
    use crate::Database;
    use chrono::TimeDelta;

    async fn setup() -> (SqliteSessionRepository, SqliteUserRepository) {
        let db = Database::in_memory().await.unwrap();
        (
            SqliteSessionRepository::new(db.pool().clone()),
            SqliteUserRepository::new(db.pool().clone()),
        )
    }

    #[tokio::test]
    async fn test_find_with_user() {
        let (sessions, users) = setup().await;
        let user_id = users
            .create(&User::new("alice", "Alice", "hash").with_greeting("hi"))
            .await
            .unwrap();
        let expires = Utc::now() + TimeDelta::days(1);

        sessions
            .create_replacing(&Session::new("token-a", user_id, expires))
            .await
            .unwrap();

        let found = sessions.find_with_user("token-a").await.unwrap().unwrap();
        assert_eq!(found.session.token, "token-a");
        assert_eq!(found.session.user_id, user_id);
        assert_eq!(found.session.expires, expires);
        assert_eq!(found.user.handle, "alice");
        assert_eq!(found.user.greeting, "hi");
    }

    #[tokio::test]
    async fn test_new_session_replaces_previous() {
        let (sessions, users) = setup().await;
        let alice = users.create(&User::new("alice", "Alice", "hash")).await.unwrap();
        let bob = users.create(&User::new("bob", "Bob", "hash")).await.unwrap();
        let expires = Utc::now() + TimeDelta::days(1);

        sessions.create_replacing(&Session::new("a1", alice, expires)).await.unwrap();
        sessions.create_replacing(&Session::new("b1", bob, expires)).await.unwrap();
        sessions.create_replacing(&Session::new("a2", alice, expires)).await.unwrap();

        assert!(sessions.find_with_user("a1").await.unwrap().is_none());
        assert!(sessions.find_with_user("a2").await.unwrap().is_some());
        assert!(sessions.find_with_user("b1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (sessions, users) = setup().await;
        let alice = users.create(&User::new("alice", "Alice", "hash")).await.unwrap();
        sessions
            .create_replacing(&Session::new("a1", alice, Utc::now() + TimeDelta::hours(1)))
            .await
            .unwrap();

        sessions.delete("a1").await.unwrap();
        sessions.delete("a1").await.unwrap();
        assert!(sessions.find_with_user("a1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let (sessions, users) = setup().await;
        let alice = users.create(&User::new("alice", "Alice", "hash")).await.unwrap();
        let bob = users.create(&User::new("bob", "Bob", "hash")).await.unwrap();
        let now = Utc::now();

        sessions
            .create_replacing(&Session::new("old", alice, now - TimeDelta::minutes(5)))
            .await
            .unwrap();
        sessions
            .create_replacing(&Session::new("live", bob, now + TimeDelta::minutes(5)))
            .await
            .unwrap();

        assert_eq!(sessions.delete_expired(now).await.unwrap(), 1);
        assert!(sessions.find_with_user("old").await.unwrap().is_none());
        assert!(sessions.find_with_user("live").await.unwrap().is_some());
    }
}
