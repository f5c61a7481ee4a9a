//! In-process TTL cache backing the idempotency checks

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::cache::IdempotencyCache;
use crate::shared::errors::RelayError;

/// Expiring "seen" markers held in process memory.
///
/// `insert_if_absent` runs under one lock, so concurrent requests for the
/// same key cannot both win.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Instant>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unexpired entries
    pub fn len(&self) -> usize {
        self.live_entries().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_entries(&self) -> Result<MutexGuard<'_, HashMap<String, Instant>>, RelayError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| RelayError::Cache("cache lock poisoned".to_string()))?;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        let purged = before - entries.len();
        if purged > 0 {
            debug!("Purged {} expired cache entries", purged);
        }
        Ok(entries)
    }
}

#[async_trait]
impl IdempotencyCache for MemoryCache {
    async fn exists(&self, key: &str) -> Result<bool, RelayError> {
        Ok(self.live_entries()?.contains_key(key))
    }

    async fn set(&self, key: &str, ttl: Duration) -> Result<(), RelayError> {
        self.live_entries()?
            .insert(key.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn insert_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, RelayError> {
        let mut entries = self.live_entries()?;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), Instant::now() + ttl);
        Ok(true)
    }
}
