//! memocache - Asynchronous memoizing cache
//!
//! A key/value cache with TTL expiration, pluggable storage backends, and a
//! memoizing wrapper that coalesces concurrent computations for the same
//! key into a single execution.
//!
//! The pieces, leaves first: a [`Clock`](clock::Clock) supplying time and
//! suspension (swappable for a deterministic test clock), a
//! [`Serializer`](serializer::Serializer) turning values into blobs for
//! durable storage, a [`KeyMaker`](key::KeyMaker) deriving byte-string keys
//! from calls, the [`Cache`](cache::Cache) contract with its discarding,
//! in-memory, and SQLite backends, and the [`Memoized`](memo::Memoized)
//! wrapper tying them together with single-flight deduplication.

pub mod cache;
pub mod clock;
pub mod error;
pub mod key;
pub mod memo;
pub mod serializer;
pub mod sweep;

pub use cache::{Cache, CacheEntry, MemoryCache, NullCache, SqliteCache, SqlitePath};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, Result};
pub use key::{KeyArgs, KeyMaker, ReprKeyMaker};
pub use memo::{Memoized, Ttl, TtlPolicy};
pub use serializer::{BincodeSerializer, JsonSerializer, Serializer};
pub use sweep::spawn_sweeper;
