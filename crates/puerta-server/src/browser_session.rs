//! Pending WebAuthn challenges kept in the caller's `tower-sessions` session.
//!
//! Session records sit in the `tower_sessions` table next to the rest of the
//! data. An abandoned challenge stops loading once its session expires, and
//! [`spawn_expired_sweep`] deletes the row.

use std::time::Duration;

use puerta_auth::{EphemeralStore, StoreError};
use puerta_storage::Database;
use tower_sessions::Session;
use tower_sessions::session_store::ExpiredDeletion;
use tower_sessions_sqlx_store::SqliteStore;
use tracing::error;

/// Session store on `db`, with its table created.
pub async fn open_store(db: &Database) -> anyhow::Result<SqliteStore> {
    let store = SqliteStore::new(db.pool().clone());
    store.migrate().await?;
    Ok(store)
}

/// Delete expired browser sessions every `period`.
pub fn spawn_expired_sweep(store: SqliteStore, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if let Err(err) = store.delete_expired().await {
                error!(error = %err, "browser session sweep failed");
            }
        }
    });
}

/// [`EphemeralStore`] over the browser session of the current request.
#[derive(Debug, Clone)]
pub struct BrowserSession(pub Session);

fn store_error(err: tower_sessions::session::Error) -> StoreError {
    StoreError::new(err.to_string())
}

impl EphemeralStore for BrowserSession {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.0.get::<Vec<u8>>(key).await.map_err(store_error)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.0.insert(key, value).await.map_err(store_error)
    }

    async fn pop(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.0.remove::<Vec<u8>>(key).await.map_err(store_error)
    }
}
