//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for all cache, serialization, and memoization
/// operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is absent from the cache, or present but expired.
    ///
    /// This is the only recoverable failure of `get`: `get_or_default` and
    /// the memoizer's hit-check absorb it; everything else propagates it.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Serializer could not encode a value of the named type.
    #[error("failed to encode value of type {type_name}: {source}")]
    Encode {
        type_name: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Serializer could not decode a blob into the named type.
    #[error("failed to decode value of type {type_name}: {source}")]
    Decode {
        type_name: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Durable storage failure; propagated unchanged, never retried here.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The blocking task running a storage operation was cancelled or
    /// panicked before reporting back.
    #[error("storage task failed: {0}")]
    StorageTask(String),

    /// Invalid TTL configuration, rejected when the policy is constructed.
    #[error("invalid TTL: {0}")]
    InvalidTtl(String),

    /// Failure of a single in-flight computation, as observed by every
    /// caller that shared it.
    #[error(transparent)]
    Shared(#[from] Arc<CacheError>),

    /// The in-flight computation was torn down (panic or runtime shutdown)
    /// before producing an outcome.
    #[error("cached computation was aborted before completing")]
    ComputationAborted,
}

impl CacheError {
    /// Builds a `KeyNotFound` from a raw key, rendering it lossily for the
    /// error message.
    pub(crate) fn key_not_found(key: &[u8]) -> Self {
        CacheError::KeyNotFound(String::from_utf8_lossy(key).into_owned())
    }

    /// True if this error (or the shared error it wraps) is `KeyNotFound`.
    pub fn is_key_not_found(&self) -> bool {
        match self {
            CacheError::KeyNotFound(_) => true,
            CacheError::Shared(inner) => inner.is_key_not_found(),
            _ => false,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
