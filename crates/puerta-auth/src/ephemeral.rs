//! Short-lived per-browser key/value storage.
//!
//! Pending WebAuthn challenges live here instead of in the durable store.
//! At the HTTP boundary the store is the caller's `tower-sessions` session;
//! [`MemoryEphemeralStore`] is the in-process variant used by tests and by
//! anything that is not behind a browser session.

#![allow(async_fn_in_trait)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use puerta_core::constants::CHALLENGE_TTL_SECS;

use crate::error::StoreError;

/// Byte blobs by key, scoped to one caller.
pub trait EphemeralStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Remove and return the value under `key`.
    async fn pop(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

#[derive(Debug)]
struct Entry {
    stored_at: Instant,
    value: Vec<u8>,
}

/// In-memory [`EphemeralStore`] whose entries vanish after a fixed lifetime.
///
/// Clones share the same entries.
#[derive(Debug, Clone)]
pub struct MemoryEphemeralStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl Default for MemoryEphemeralStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(CHALLENGE_TTL_SECS))
    }
}

impl MemoryEphemeralStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Drop every entry older than the lifetime, returning how many went.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_live(&self, key: &str, remove: bool) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let live = entries
            .get(key)
            .is_some_and(|entry| entry.stored_at.elapsed() < self.ttl);

        if !live {
            entries.remove(key);
            return None;
        }
        if remove {
            entries.remove(key).map(|entry| entry.value)
        } else {
            entries.get(key).map(|entry| entry.value.clone())
        }
    }
}

impl EphemeralStore for MemoryEphemeralStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.take_live(key, false))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key.to_string(),
                Entry {
                    stored_at: Instant::now(),
                    value,
                },
            );
        Ok(())
    }

    async fn pop(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.take_live(key, true))
    }
}
