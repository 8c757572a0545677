//! Cache Module
//!
//! The storage abstraction and its three interchangeable backends: a
//! discarding no-op, an in-process map, and a durable SQLite-backed store.

mod entry;
mod memory;
mod null;
mod sqlite;


// Re-export public types
pub use entry::CacheEntry;
pub use memory::MemoryCache;
pub use null::NullCache;
pub use sqlite::{SqliteCache, SqlitePath};

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CacheError, Result};

// == Cache Trait ==
/// Asynchronous key/value cache with TTL expiration.
///
/// Keys are opaque byte strings, matched exactly. A key maps to at most one
/// live entry; `put` on an existing key fully replaces the prior entry,
/// value and TTL both.
///
/// The only recoverable failure is [`CacheError::KeyNotFound`] from
/// [`get`](Cache::get); serialization and storage errors propagate to the
/// caller unchanged.
#[async_trait]
pub trait Cache<V: Send + Sync + 'static>: Send + Sync {
    /// Returns the cached value for `key`.
    ///
    /// Fails with `KeyNotFound` if the key is absent, or present but
    /// expired. The expiry boundary is inclusive: an entry whose
    /// `expires_at` equals the current time is still live.
    async fn get(&self, key: &[u8]) -> Result<V>;

    /// Inserts or replaces the entry for `key`.
    ///
    /// `ttl = None` stores the value without expiration; `Some(d)` expires
    /// it `d` after the backend clock's current time.
    async fn put(&self, key: &[u8], value: V, ttl: Option<Duration>) -> Result<()>;

    /// Deletes the entry for `key`; no-op if absent.
    async fn remove(&self, key: &[u8]) -> Result<()>;

    /// Sweeps entries that expired strictly before the current time and
    /// returns how many were removed.
    ///
    /// Best-effort housekeeping: `get` re-checks expiry at read time
    /// regardless, so correctness never depends on this running.
    async fn remove_expired(&self) -> Result<usize>;

    /// Returns all currently live entries. Debugging and testing
    /// affordance, not a production hot path.
    async fn snapshot(&self) -> Result<HashMap<Vec<u8>, V>>;

    /// Returns the cached value for `key`, or `default` if the key is
    /// absent or expired. Every failure other than `KeyNotFound`
    /// propagates unchanged.
    async fn get_or_default(&self, key: &[u8], default: V) -> Result<V> {
        match self.get(key).await {
            Ok(value) => Ok(value),
            Err(CacheError::KeyNotFound(_)) => Ok(default),
            Err(e) => Err(e),
        }
    }
}
