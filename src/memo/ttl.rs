//! TTL Policy
//!
//! Decides, once per computation, whether and for how long a computed value
//! is stored. The decision may depend on the value itself, which is why the
//! policy is resolved after the computation rather than at configuration
//! time.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::error::{CacheError, Result};

// == Ttl Outcome ==
/// Resolved storage decision for one computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Do not store the value at all.
    Skip,
    /// Store without expiration.
    Forever,
    /// Store and expire after the duration.
    Expires(Duration),
}

// == Ttl Policy ==
/// Per-memoizer TTL configuration.
///
/// `A` is the memoized call's argument type, `V` its value type; the
/// [`Custom`](TtlPolicy::Custom) variant sees both.
pub enum TtlPolicy<A, V> {
    /// Never store: disables caching entirely while keeping single-flight
    /// deduplication.
    Disabled,
    /// Store every value with the same fixed TTL.
    Fixed(Duration),
    /// Store every value with a TTL drawn uniformly from `[min, max]`,
    /// fresh per call. Spreads out expiry of entries populated together so
    /// they are not all recomputed at once.
    Jittered { min: Duration, max: Duration },
    /// Value-dependent policy: the function sees the call's arguments and
    /// the computed value and returns the full [`Ttl`] decision.
    Custom(Arc<dyn Fn(&A, &V) -> Ttl + Send + Sync>),
}

impl<A, V> TtlPolicy<A, V> {
    /// Builds a jittered policy. An inverted range is rejected here, at
    /// construction, never at call time.
    pub fn jittered(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(CacheError::InvalidTtl(format!(
                "jitter range is inverted: min {:?} exceeds max {:?}",
                min, max
            )));
        }
        Ok(TtlPolicy::Jittered { min, max })
    }

    /// Builds a value-dependent policy from a plain function or closure.
    pub fn custom(f: impl Fn(&A, &V) -> Ttl + Send + Sync + 'static) -> Self {
        TtlPolicy::Custom(Arc::new(f))
    }

    /// Resolves the policy for one computation.
    pub fn resolve(&self, args: &A, value: &V) -> Ttl {
        match self {
            TtlPolicy::Disabled => Ttl::Skip,
            TtlPolicy::Fixed(d) => Ttl::Expires(*d),
            TtlPolicy::Jittered { min, max } => {
                let secs = rand::thread_rng().gen_range(min.as_secs_f64()..=max.as_secs_f64());
                Ttl::Expires(Duration::from_secs_f64(secs))
            }
            TtlPolicy::Custom(f) => f(args, value),
        }
    }
}

impl<A, V> std::fmt::Debug for TtlPolicy<A, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TtlPolicy::Disabled => f.write_str("Disabled"),
            TtlPolicy::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            TtlPolicy::Jittered { min, max } => f
                .debug_struct("Jittered")
                .field("min", min)
                .field("max", max)
                .finish(),
            TtlPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
