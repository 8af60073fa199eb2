#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::Credential;
use sqlx::SqlitePool;

/// Repository trait for enrolled WebAuthn credentials
pub trait CredentialRepository: Send + Sync {
    /// Every credential enrolled by a user, oldest first
    async fn find_by_user(&self, user_id: i64) -> StorageResult<Vec<Credential>>;

    /// Store a new credential, returning its ID
    async fn create(&self, credential: &Credential) -> StorageResult<i64>;

    /// Remove every credential of a user, returning how many were removed
    async fn delete_for_user(&self, user_id: i64) -> StorageResult<u64>;
}

/// SQLite implementation of CredentialRepository
#[derive(Debug, Clone)]
pub struct SqliteCredentialRepository {
    pool: SqlitePool,
}

impl SqliteCredentialRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl CredentialRepository for SqliteCredentialRepository {
    async fn find_by_user(&self, user_id: i64) -> StorageResult<Vec<Credential>> {
        let credentials = sqlx::query_as::<_, Credential>(
            r#"
            SELECT id, user_id, credential_id, passkey, created_at
            FROM credentials
            WHERE user_id = ?
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(credentials)
    }

    async fn create(&self, credential: &Credential) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO credentials (user_id, credential_id, passkey, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(credential.user_id)
        .bind(&credential.credential_id)
        .bind(&credential.passkey)
        .bind(credential.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            StorageError::on_unique_violation(e, "credential", &credential.credential_id)
        })?;

        Ok(result.last_insert_rowid())
    }

    async fn delete_for_user(&self, user_id: i64) -> StorageResult<u64> {
        let result = sqlx::query("DELETE FROM credentials WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
