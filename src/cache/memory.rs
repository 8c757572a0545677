//! In-Memory Cache Backend
//!
//! Process-local map with lazy expiry on read and an eager sweep for
//! housekeeping. Entries live exactly as long as the process unless a TTL
//! evicts them first.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{Cache, CacheEntry};
use crate::clock::{Clock, SystemClock};
use crate::error::{CacheError, Result};

// == Memory Cache ==
/// The simplest real backend: entries in a `HashMap` behind one lock.
///
/// Expiry is lazy (checked on every `get` against the injected clock) plus
/// eager (`remove_expired` rebuilds the map keeping only live entries).
/// The sweep is best-effort with respect to concurrent operations; `get`
/// re-checks expiry itself, so nothing depends on sweep timing.
pub struct MemoryCache<V> {
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<Vec<u8>, CacheEntry<V>>>,
}

impl<V> MemoryCache<V> {
    /// Creates an empty cache on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty cache on the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The clock this cache evaluates expiry against.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Current number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True if no entries are stored at all.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for MemoryCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache").finish_non_exhaustive()
    }
}

#[async_trait]
impl<V> Cache<V> for MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &[u8]) -> Result<V> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(entry.value.clone()),
            _ => Err(CacheError::key_not_found(key)),
        }
    }

    async fn put(&self, key: &[u8], value: V, ttl: Option<Duration>) -> Result<()> {
        let now = self.clock.now();
        let entry = CacheEntry::new(value, now, ttl);
        self.entries.write().await.insert(key.to_vec(), entry);
        Ok(())
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn remove_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "swept expired in-memory entries");
        }
        Ok(removed)
    }

    async fn snapshot(&self) -> Result<HashMap<Vec<u8>, V>> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect())
    }
}
