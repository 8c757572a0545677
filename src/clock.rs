//! Clock Abstraction
//!
//! Supplies current time and a suspension primitive to every cache backend.
//! Injecting a [`ManualClock`] makes TTL expiration tests instantaneous and
//! reproducible.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

// == Clock Trait ==
/// Measures elapsed time and waits.
///
/// Timestamps are wall-clock seconds since the Unix epoch, as `f64` (the
/// same representation the durable backend persists).
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current time, in seconds since the Unix epoch.
    fn now(&self) -> f64;

    /// Suspends the caller for at least `duration` without blocking other
    /// concurrent tasks.
    async fn sleep(&self, duration: Duration);
}

// == System Clock ==
/// Real-time clock backed by the platform wall clock and the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// == Manual Clock ==
/// Deterministic test clock.
///
/// `now` reads an internal counter; `sleep` advances that counter by the
/// requested duration and returns immediately, so expiry tests never wait
/// on real time. The counter has microsecond granularity.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    /// Creates a manual clock starting at t = 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock by `duration` without suspending.
    pub fn advance(&self, duration: Duration) {
        self.micros
            .fetch_add(duration.as_micros() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
