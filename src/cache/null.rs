//! Null Cache Backend
//!
//! Discards everything. Used to disable caching without changing call
//! sites: every `get` misses, every `put` is a no-op.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::Cache;
use crate::error::{CacheError, Result};

// == Null Cache ==
/// A cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache<V> {
    _values: PhantomData<fn() -> V>,
}

impl<V> NullCache<V> {
    /// Creates a discarding cache.
    pub fn new() -> Self {
        Self {
            _values: PhantomData,
        }
    }
}

#[async_trait]
impl<V> Cache<V> for NullCache<V>
where
    V: Send + Sync + 'static,
{
    async fn get(&self, key: &[u8]) -> Result<V> {
        Err(CacheError::key_not_found(key))
    }

    async fn put(&self, _key: &[u8], _value: V, _ttl: Option<Duration>) -> Result<()> {
        Ok(())
    }

    async fn remove(&self, _key: &[u8]) -> Result<()> {
        Ok(())
    }

    async fn remove_expired(&self) -> Result<usize> {
        Ok(0)
    }

    async fn snapshot(&self) -> Result<HashMap<Vec<u8>, V>> {
        Ok(HashMap::new())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_always_misses() {
        let cache: NullCache<String> = NullCache::new();
        cache.put(b"foo", "bar".to_string(), None).await.unwrap();
        let err = cache.get(b"foo").await.unwrap_err();
        assert!(err.is_key_not_found());
    }

    #[tokio::test]
    async fn test_get_or_default_returns_default() {
        let cache: NullCache<i32> = NullCache::new();
        cache.put(b"n", 1, None).await.unwrap();
        assert_eq!(cache.get_or_default(b"n", 7).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_remove_and_sweep_are_noops() {
        let cache: NullCache<i32> = NullCache::new();
        cache.remove(b"missing").await.unwrap();
        assert_eq!(cache.remove_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_is_empty() {
        let cache: NullCache<i32> = NullCache::new();
        cache.put(b"n", 1, Some(Duration::from_secs(60))).await.unwrap();
        assert!(cache.snapshot().await.unwrap().is_empty());
    }
}
