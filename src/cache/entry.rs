//! Cache Entry
//!
//! A stored value together with its expiry metadata. Liveness is evaluated
//! against a caller-supplied timestamp so backends stay clock-agnostic.

use std::time::Duration;

// == Cache Entry ==
/// A single cache entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value.
    pub value: V,
    /// Expiration timestamp in epoch seconds; `None` means never expires.
    pub expires_at: Option<f64>,
}

impl<V> CacheEntry<V> {
    /// Creates an entry expiring `ttl` after `now`, or never for
    /// `ttl = None`.
    pub fn new(value: V, now: f64, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| now + d.as_secs_f64()),
        }
    }

    /// Whether the entry is live at `now`.
    ///
    /// The boundary is inclusive: an entry whose `expires_at` equals `now`
    /// is still live; only an `expires_at` strictly in the past is expired.
    pub fn is_live(&self, now: f64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at >= now,
            None => true,
        }
    }

    /// Remaining lifetime at `now`: `None` for never-expiring entries,
    /// `Some(ZERO)` once expired.
    pub fn remaining(&self, now: f64) -> Option<Duration> {
        self.expires_at.map(|expires_at| {
            if expires_at > now {
                Duration::from_secs_f64(expires_at - now)
            } else {
                Duration::ZERO
            }
        })
    }
}
