#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::AuditLog;
use sqlx::SqlitePool;

/// Repository trait for the entry audit trail
pub trait AuditLogRepository: Send + Sync {
    /// Append an entry, returning its ID
    async fn append(&self, entry: &AuditLog) -> StorageResult<i64>;

    /// Most recent entries, newest first
    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<AuditLog>>;

    /// Most recent entries of one user, newest first
    async fn find_by_user(&self, user_handle: &str, limit: i64) -> StorageResult<Vec<AuditLog>>;
}

/// SQLite implementation of AuditLogRepository
#[derive(Debug, Clone)]
pub struct SqliteAuditLogRepository {
    pool: SqlitePool,
}

impl SqliteAuditLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AuditLogRepository for SqliteAuditLogRepository {
    async fn append(&self, entry: &AuditLog) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_log (
                timestamp, user_handle, second_factor,
                failure, error, ip_address, user_agent
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.timestamp)
        .bind(&entry.user_handle)
        .bind(entry.second_factor)
        .bind(&entry.failure)
        .bind(&entry.error)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<AuditLog>> {
        let entries = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, timestamp, user_handle, second_factor,
                   failure, error, ip_address, user_agent
            FROM audit_log
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn find_by_user(&self, user_handle: &str, limit: i64) -> StorageResult<Vec<AuditLog>> {
        let entries = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, timestamp, user_handle, second_factor,
                   failure, error, ip_address, user_agent
            FROM audit_log
            WHERE user_handle = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_handle)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
