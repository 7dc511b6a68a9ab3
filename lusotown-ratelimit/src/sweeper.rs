//! Periodic removal of expired buckets.
//!
//! Limiting only checks the keys it touches, so buckets of identifiers that
//! stop calling linger until swept. Run a sweeper next to long-lived limiters
//! to keep memory bounded.

use crate::clock::Clock;
use crate::community::CommunityRateLimiter;
use crate::limiter::RateLimiter;
use crate::store::BucketStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// A limiter whose expired buckets can be swept.
pub trait SweepExpired: Send + Sync + 'static {
    /// Removes expired buckets, returning how many were removed.
    fn sweep_expired(&self) -> usize;
}

impl<S, C> SweepExpired for RateLimiter<S, C>
where
    S: BucketStore + 'static,
    C: Clock + 'static,
{
    fn sweep_expired(&self) -> usize {
        RateLimiter::sweep_expired(self)
    }
}

impl<S, C> SweepExpired for CommunityRateLimiter<S, C>
where
    S: BucketStore + 'static,
    C: Clock + 'static,
{
    fn sweep_expired(&self) -> usize {
        CommunityRateLimiter::sweep_expired(self)
    }
}

/// Spawns a Tokio task that sweeps `limiter` every `period`.
///
/// The first sweep runs immediately. Abort the returned handle to stop it.
///
/// # Panics
///
/// Panics if `period` is zero or if called outside a Tokio runtime.
pub fn spawn_sweeper<L: SweepExpired>(limiter: Arc<L>, period: Duration) -> JoinHandle<()> {
    info!(?period, "Starting bucket sweeper");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = limiter.sweep_expired();
            if removed > 0 {
                debug!(removed, "Sweeper removed expired buckets");
            }
        }
    })
}
