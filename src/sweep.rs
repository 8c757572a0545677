//! Expiry Sweeper Task
//!
//! Background task that periodically removes expired cache entries.
//! Housekeeping only: `get` re-checks expiry at read time, so correctness
//! never depends on this task running.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::Cache;

/// Spawns a background task that periodically sweeps expired entries from
/// the cache.
///
/// The task loops forever, sleeping `interval` between sweeps; abort it
/// through the returned handle during shutdown.
pub fn spawn_sweeper<V>(cache: Arc<dyn Cache<V>>, interval: Duration) -> JoinHandle<()>
where
    V: Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(?interval, "starting expiry sweeper");

        loop {
            tokio::time::sleep(interval).await;

            match cache.remove_expired().await {
                Ok(removed) if removed > 0 => {
                    info!(removed, "expiry sweep removed entries");
                }
                Ok(_) => {
                    debug!("expiry sweep found nothing to remove");
                }
                Err(e) => {
                    // Sweeping is best-effort; the next tick retries.
                    warn!(error = %e, "expiry sweep failed");
                }
            }
        }
    })
}
