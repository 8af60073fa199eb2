#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::User;
use sqlx::SqlitePool;

/// Repository trait for User entity operations
///
/// Uses native async trait methods (Edition 2024), so implementations are
/// used through generics rather than trait objects.
pub trait UserRepository: Send + Sync {
    /// Find a user by their ID
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<User>>;

    /// Find a user by their login handle
    async fn find_by_handle(&self, handle: &str) -> StorageResult<Option<User>>;

    /// Create a new user, returning its ID
    async fn create(&self, user: &User) -> StorageResult<i64>;

    /// All users ordered by handle
    async fn list(&self) -> StorageResult<Vec<User>>;
}

/// SQLite implementation of UserRepository
#[derive(Debug, Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl UserRepository for SqliteUserRepository {
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, handle, name, password, greeting,
                   schedule, expires, ttl, is_admin, require_2fa,
                   created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_handle(&self, handle: &str) -> StorageResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, handle, name, password, greeting,
                   schedule, expires, ttl, is_admin, require_2fa,
                   created_at
            FROM users
            WHERE handle = ?
            "#,
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, user: &User) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (
                handle, name, password, greeting,
                schedule, expires, ttl, is_admin, require_2fa,
                created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.handle)
        .bind(&user.name)
        .bind(&user.password)
        .bind(&user.greeting)
        .bind(user.schedule.as_ref().map(|s| s.source().to_string()))
        .bind(user.expires)
        .bind(user.ttl.to_string())
        .bind(user.is_admin)
        .bind(user.require_2fa)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::on_unique_violation(e, "user", &user.handle))?;

        Ok(result.last_insert_rowid())
    }

    async fn list(&self) -> StorageResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, handle, name, password, greeting,
                   schedule, expires, ttl, is_admin, require_2fa,
                   created_at
            FROM users
            ORDER BY handle
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
