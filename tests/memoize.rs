//! End-to-End Memoization Tests
//!
//! Exercises the full stack: key derivation, single-flight deduplication,
//! TTL policy resolution, and the storage backends behind the memoizer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use memocache::{
    Cache, CacheError, ManualClock, MemoryCache, Memoized, SqliteCache, TtlPolicy,
};

/// Routes the crate's tracing output through the test harness so a failing
/// scenario shows what the memoizer and backends were doing.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("memocache=debug")
        .with_test_writer()
        .try_init();
}

// == Single-Flight ==

#[tokio::test]
async fn concurrent_identical_calls_compute_once() {
    init_tracing();
    let executions = Arc::new(AtomicUsize::new(0));
    let executions_in = Arc::clone(&executions);

    let memo = Arc::new(
        Memoized::new("tests:slow_double", move |args: (u64,)| {
            let executions = Arc::clone(&executions_in);
            async move {
                executions.fetch_add(1, Ordering::SeqCst);
                // Long enough that every caller arrives while in flight.
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(args.0 * 2)
            }
        })
        .with_ttl(TtlPolicy::Fixed(Duration::from_secs(60))),
    );

    let mut handles = Vec::new();
    for _ in 0..10 {
        let memo = Arc::clone(&memo);
        handles.push(tokio::spawn(async move { memo.call((21,)).await }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 42);
    }
    assert_eq!(executions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_distinct_calls_compute_independently() {
    init_tracing();
    let executions = Arc::new(AtomicUsize::new(0));
    let executions_in = Arc::clone(&executions);

    let memo = Arc::new(
        Memoized::new("tests:slow_double", move |args: (u64,)| {
            let executions = Arc::clone(&executions_in);
            async move {
                executions.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(args.0 * 2)
            }
        })
        .with_ttl(TtlPolicy::Fixed(Duration::from_secs(60))),
    );

    let a = tokio::spawn({
        let memo = Arc::clone(&memo);
        async move { memo.call((1,)).await }
    });
    let b = tokio::spawn({
        let memo = Arc::clone(&memo);
        async move { memo.call((2,)).await }
    });

    assert_eq!(a.await.unwrap().unwrap(), 2);
    assert_eq!(b.await.unwrap().unwrap(), 4);
    assert_eq!(executions.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failure_reaches_every_waiter_and_next_call_retries() {
    init_tracing();
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_in = Arc::clone(&attempts);

    let memo: Arc<Memoized<(u64,), u64>> = Arc::new(
        Memoized::new("tests:flaky", move |_args: (u64,)| {
            let attempts = Arc::clone(&attempts_in);
            async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                if attempt == 0 {
                    Err(CacheError::InvalidTtl("transient".to_string()))
                } else {
                    Ok(9)
                }
            }
        })
        .with_ttl(TtlPolicy::Fixed(Duration::from_secs(60))),
    );

    let mut handles = Vec::new();
    for _ in 0..5 {
        let memo = Arc::clone(&memo);
        handles.push(tokio::spawn(async move { memo.call((1,)).await }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_err());
    }
    // Exactly one execution was shared by all five waiters.
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    // The failure was not cached and the pending entry is gone.
    assert_eq!(memo.call((1,)).await.unwrap(), 9);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

// == Identity Semantics ==

#[tokio::test]
async fn cached_calls_return_the_identical_value() {
    init_tracing();
    let memo = Memoized::new("tests:make_object", |args: (u64,)| async move {
        Ok(Arc::new(vec![args.0; 3]))
    })
    .with_ttl(TtlPolicy::jittered(Duration::from_secs(1), Duration::from_secs(60)).unwrap());

    let a1 = memo.call((5,)).await.unwrap();
    let a2 = memo.call((5,)).await.unwrap();
    let b1 = memo.call((6,)).await.unwrap();

    // Repeated calls observe the very same allocation; distinct arguments
    // do not.
    assert!(Arc::ptr_eq(&a1, &a2));
    assert!(!Arc::ptr_eq(&a1, &b1));

    // Invalidation forces a fresh, distinct-but-equal value.
    memo.invalidate(&(5,)).await.unwrap();
    let a3 = memo.call((5,)).await.unwrap();
    assert!(!Arc::ptr_eq(&a1, &a3));
    assert_eq!(*a1, *a3);
}

// == TTL Expiry Through the Memoizer ==

#[tokio::test]
async fn expired_entries_are_recomputed() {
    init_tracing();
    let executions = Arc::new(AtomicUsize::new(0));
    let executions_in = Arc::clone(&executions);
    let clock = Arc::new(ManualClock::new());

    let memo = Memoized::new("tests:double", move |args: (u64,)| {
        let executions = Arc::clone(&executions_in);
        async move {
            executions.fetch_add(1, Ordering::SeqCst);
            Ok(args.0 * 2)
        }
    })
    .with_cache(Arc::new(MemoryCache::with_clock(clock.clone())))
    .with_ttl(TtlPolicy::Fixed(Duration::from_secs(10)));

    assert_eq!(memo.call((4,)).await.unwrap(), 8);
    assert_eq!(memo.call((4,)).await.unwrap(), 8);
    assert_eq!(executions.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(11));
    assert_eq!(memo.call((4,)).await.unwrap(), 8);
    assert_eq!(executions.load(Ordering::SeqCst), 2);
}

// == Durable Backend Behind the Memoizer ==

#[tokio::test]
async fn memoizes_through_sqlite() {
    init_tracing();
    let executions = Arc::new(AtomicUsize::new(0));
    let executions_in = Arc::clone(&executions);

    let cache: Arc<SqliteCache<u64>> = Arc::new(SqliteCache::in_memory());
    let memo = Memoized::new("tests:double", move |args: (u64,)| {
        let executions = Arc::clone(&executions_in);
        async move {
            executions.fetch_add(1, Ordering::SeqCst);
            Ok(args.0 * 2)
        }
    })
    .with_cache(cache.clone() as Arc<dyn Cache<u64>>)
    .with_ttl(TtlPolicy::Fixed(Duration::from_secs(60)));

    assert_eq!(memo.call((8,)).await.unwrap(), 16);
    assert_eq!(memo.call((8,)).await.unwrap(), 16);
    assert_eq!(executions.load(Ordering::SeqCst), 1);

    // The value really went through the durable store.
    let snapshot = cache.snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.values().any(|v| *v == 16));
    cache.close().await.unwrap();
}

#[tokio::test]
async fn sqlite_memoization_survives_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memo.db");
    let executions = Arc::new(AtomicUsize::new(0));

    for round in 0..2 {
        let executions_in = Arc::clone(&executions);
        let cache: Arc<SqliteCache<u64>> = Arc::new(SqliteCache::open(&path));
        let memo = Memoized::new("tests:double", move |args: (u64,)| {
            let executions = Arc::clone(&executions_in);
            async move {
                executions.fetch_add(1, Ordering::SeqCst);
                Ok(args.0 * 2)
            }
        })
        .with_cache(cache.clone() as Arc<dyn Cache<u64>>)
        .with_ttl(TtlPolicy::Fixed(Duration::from_secs(3600)));

        assert_eq!(memo.call((8,)).await.unwrap(), 16, "round {}", round);
        cache.close().await.unwrap();
    }

    // The second process-lifetime hit the persisted entry.
    assert_eq!(executions.load(Ordering::SeqCst), 1);
}
