//! Minimal TTL-capable key/value surface.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection-level failure (refused, dropped, timed out). Consumers
    /// treat this as a signal to degrade, not as a per-call failure.
    #[error("store connection error: {0}")]
    Unavailable(String),

    /// The backend answered but the command failed.
    #[error("store command error: {0}")]
    Command(String),
}

/// The slice of a key/value store the blacklist needs: set a marker (with an
/// optional TTL in seconds), clear it, and ask whether it exists.
#[async_trait]
pub trait TtlStore: Send + Sync {
    async fn set(&self, key: &str, ttl_seconds: Option<u64>) -> Result<(), StoreError>;
    async fn del(&self, key: &str) -> Result<(), StoreError>;
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
}

/// In-memory [`TtlStore`] for dev and tests. Expired entries are dropped
/// lazily on read.
#[derive(Debug, Default)]
pub struct MemoryTtlStore {
    entries: Mutex<HashMap<String, Option<Instant>>>,
}

impl MemoryTtlStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TtlStore for MemoryTtlStore {
    async fn set(&self, key: &str, ttl_seconds: Option<u64>) -> Result<(), StoreError> {
        let deadline = ttl_seconds.map(|secs| Instant::now() + Duration::from_secs(secs));
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), deadline);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(Some(deadline)) if *deadline <= Instant::now() => {
                entries.remove(key);
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }
}
