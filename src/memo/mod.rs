//! Memoization Module
//!
//! Wraps an asynchronous computation with a cache lookup and a
//! pending-computation table, so that concurrent identical calls share one
//! underlying execution ("single-flight") and completed results are stored
//! under a TTL policy.

mod ttl;

pub use ttl::{Ttl, TtlPolicy};

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::cache::{Cache, MemoryCache};
use crate::error::{CacheError, Result};
use crate::key::{KeyArgs, KeyMaker, ReprKeyMaker};

/// Outcome of one in-flight computation, cloneable to every waiter.
type SharedResult<V> = std::result::Result<V, Arc<CacheError>>;

type BoxedComputeFuture<V> = Pin<Box<dyn Future<Output = Result<V>> + Send>>;
type ComputeFn<A, V> = Arc<dyn Fn(A) -> BoxedComputeFuture<V> + Send + Sync>;

/// `key -> in-flight computation` for one memoized callable. Entries exist
/// exactly while their computation runs; the table never accumulates stale
/// entries.
type PendingTable<V> = Arc<Mutex<HashMap<Vec<u8>, broadcast::Sender<SharedResult<V>>>>>;

// == Memoized ==
/// A memoized asynchronous computation.
///
/// One instance per wrapped callable. Each call derives a cache key from
/// the target identity and the call's arguments, consults the cache, and on
/// a miss runs the wrapped computation, at most once per key at any
/// instant, no matter how many callers arrive concurrently. All concurrent
/// callers for a key observe the same outcome, success or failure; failures
/// are not retried (the next, non-concurrent call starts fresh).
///
/// Defaults: a fresh [`MemoryCache`] per instance (never a shared global),
/// [`ReprKeyMaker`], and [`TtlPolicy::Disabled`] (single-flight
/// deduplication without storage). Configure with the `with_*` builders.
///
/// There is no cancellation protocol: the computation runs in a spawned
/// task, so dropping callers does not cancel it, and a computation that
/// never completes blocks its waiters indefinitely.
pub struct Memoized<A, V> {
    target: String,
    cache: Arc<dyn Cache<V>>,
    key_maker: Arc<dyn KeyMaker>,
    ttl: Arc<TtlPolicy<A, V>>,
    compute: ComputeFn<A, V>,
    pending: PendingTable<V>,
}

impl<A, V> Memoized<A, V>
where
    A: KeyArgs + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Wraps `compute` under the given target identity (conventionally
    /// `"module:qualified_name"`, the stable half of every derived key).
    pub fn new<F, Fut>(target: impl Into<String>, compute: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        Self {
            target: target.into(),
            cache: Arc::new(MemoryCache::new()),
            key_maker: Arc::new(ReprKeyMaker::new()),
            ttl: Arc::new(TtlPolicy::Disabled),
            compute: Arc::new(move |args| Box::pin(compute(args)) as BoxedComputeFuture<V>),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Replaces the storage backend.
    pub fn with_cache(mut self, cache: Arc<dyn Cache<V>>) -> Self {
        self.cache = cache;
        self
    }

    /// Replaces the key maker.
    pub fn with_key_maker(mut self, key_maker: Arc<dyn KeyMaker>) -> Self {
        self.key_maker = key_maker;
        self
    }

    /// Replaces the TTL policy.
    pub fn with_ttl(mut self, ttl: TtlPolicy<A, V>) -> Self {
        self.ttl = Arc::new(ttl);
        self
    }

    /// The storage backend this memoizer consults.
    pub fn cache(&self) -> Arc<dyn Cache<V>> {
        Arc::clone(&self.cache)
    }

    /// Invokes the memoized computation.
    ///
    /// Joins an in-flight computation for the same key if one exists;
    /// otherwise registers one atomically with the lookup and runs it.
    pub async fn call(&self, args: A) -> Result<V> {
        let key = self.key_maker.make_key(&self.target, &args.key_parts());

        let mut rx = {
            let mut pending = self.pending.lock();
            match pending.get(&key) {
                Some(tx) => {
                    debug!(
                        key = %String::from_utf8_lossy(&key),
                        "joining in-flight computation"
                    );
                    tx.subscribe()
                }
                None => {
                    let (tx, rx) = broadcast::channel(1);
                    pending.insert(key.clone(), tx.clone());
                    self.spawn_computation(key.clone(), args, tx);
                    rx
                }
            }
        };

        match rx.recv().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(shared)) => Err(CacheError::Shared(shared)),
            // The sender dropped without an outcome: the task panicked or
            // the runtime tore it down.
            Err(_) => Err(CacheError::ComputationAborted),
        }
    }

    /// Removes the cached entry for these arguments.
    ///
    /// Does not affect a computation currently in flight for the same key;
    /// it will still complete and may repopulate the cache.
    pub async fn invalidate(&self, args: &A) -> Result<()> {
        let key = self.key_maker.make_key(&self.target, &args.key_parts());
        self.cache.remove(&key).await
    }

    fn spawn_computation(&self, key: Vec<u8>, args: A, tx: broadcast::Sender<SharedResult<V>>) {
        let cache = Arc::clone(&self.cache);
        let ttl = Arc::clone(&self.ttl);
        let compute = Arc::clone(&self.compute);
        let pending = Arc::clone(&self.pending);

        tokio::spawn(async move {
            // If the computation unwinds, the guard still clears the
            // pending entry so later calls can retry; waiters then see the
            // channel close.
            let guard = PendingGuard {
                pending: Arc::clone(&pending),
                key: key.clone(),
                armed: true,
            };

            let result = Self::get_or_compute(&cache, &ttl, &compute, &key, args).await;
            let shared = result.map_err(Arc::new);

            guard.disarm();
            let mut table = pending.lock();
            table.remove(&key);
            // A send error only means every waiter has gone away.
            let _ = tx.send(shared);
        });
    }

    async fn get_or_compute(
        cache: &Arc<dyn Cache<V>>,
        ttl: &TtlPolicy<A, V>,
        compute: &ComputeFn<A, V>,
        key: &[u8],
        args: A,
    ) -> Result<V> {
        match cache.get(key).await {
            // Hit: no recomputation, no TTL recalculation.
            Ok(value) => return Ok(value),
            Err(CacheError::KeyNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let value = (compute)(args.clone()).await?;
        match ttl.resolve(&args, &value) {
            Ttl::Skip => {}
            Ttl::Forever => cache.put(key, value.clone(), None).await?,
            Ttl::Expires(d) => cache.put(key, value.clone(), Some(d)).await?,
        }
        Ok(value)
    }
}

impl<A, V> std::fmt::Debug for Memoized<A, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoized")
            .field("target", &self.target)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

// == Pending Guard ==
/// Removes a pending-table entry on every exit path of a computation.
struct PendingGuard<V> {
    pending: PendingTable<V>,
    key: Vec<u8>,
    armed: bool,
}

impl<V> PendingGuard<V> {
    /// Hands cleanup responsibility back to the caller.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<V> Drop for PendingGuard<V> {
    fn drop(&mut self) {
        if self.armed {
            self.pending.lock().remove(&self.key);
        }
    }
}
