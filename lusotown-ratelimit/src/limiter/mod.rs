//! Fixed-window request limiter.
//!
//! Time is cut into slices of the policy's window length, aligned to the
//! Unix epoch. Each identifier gets one counter per slice, stored under
//! `<identifier>:<slice index>`. A new slice starts a new counter; old ones
//! are never reused and are dropped once their reset time has passed.
//!
//! Because slices are fixed, a client may use a full quota at the end of one
//! slice and another full quota at the start of the next.

mod result;

pub use result::{RateLimitResult, Usage};

use crate::clock::{Clock, SystemClock};
use crate::policy::RateLimitPolicy;
use crate::store::{BucketStore, MemoryStore, WindowBucket};
use crate::window::{Window, WindowError};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Per-identifier call counter over fixed time windows.
///
/// All operations run under one lock around the bucket store, so the
/// check-then-increment in [`limit`](Self::limit) is atomic and the limiter
/// can be shared between threads behind an `Arc`.
#[derive(Debug)]
pub struct RateLimiter<S = MemoryStore, C = SystemClock> {
    store: Mutex<S>,
    clock: C,
}

impl RateLimiter {
    /// Creates a limiter with an in-memory store and the wall clock.
    ///
    /// No background cleanup is started. Buckets of identifiers that stop
    /// calling stay stored until [`sweep_expired`](Self::sweep_expired) runs,
    /// so long-lived limiters should be handed to
    /// [`spawn_sweeper`](crate::sweeper::spawn_sweeper).
    #[must_use]
    pub fn new() -> Self {
        Self::with_store_and_clock(MemoryStore::new(), SystemClock)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BucketStore, C: Clock> RateLimiter<S, C> {
    /// Creates a limiter over the given store and clock.
    pub fn with_store_and_clock(store: S, clock: C) -> Self {
        Self {
            store: Mutex::new(store),
            clock,
        }
    }

    /// Returns the limiter's clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Records a call for `identifier` if the policy still allows one.
    ///
    /// A rejected call leaves the counter untouched.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError`] if `policy.window` is malformed. This is a
    /// configuration defect, not a client overage.
    pub fn limit(
        &self,
        identifier: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitResult, WindowError> {
        let window = policy.parsed_window()?;
        let now = self.clock.now_ms();
        let index = window.index_at(now);
        let key = bucket_key(identifier, index);

        let mut store = self.lock_store();
        drop_if_expired(&mut *store, &key, now);
        if let Some(previous) = index.checked_sub(1) {
            drop_if_expired(&mut *store, &bucket_key(identifier, previous), now);
        }

        let mut bucket = store
            .get(&key)
            .unwrap_or_else(|| WindowBucket::new(now.saturating_add(window.as_millis())));

        if bucket.count >= policy.requests {
            info!(
                identifier,
                limit = policy.requests,
                reset = bucket.reset_time,
                "Rate limit exceeded"
            );
            return Ok(RateLimitResult::rejected(
                policy.requests,
                bucket.reset_time,
                policy.message.clone(),
            ));
        }

        bucket.count += 1;
        store.set(&key, bucket);

        let remaining = policy.requests - bucket.count;
        debug!(identifier, count = bucket.count, remaining, "Call admitted");
        Ok(RateLimitResult::allowed(
            policy.requests,
            remaining,
            bucket.reset_time,
        ))
    }

    /// Forgets every bucket whose key starts with `<identifier>:`.
    ///
    /// This includes buckets of identifiers nested under `identifier`, so
    /// resetting `user` also clears `user:42`, but not `username`. Safe to
    /// call when nothing is stored.
    pub fn reset(&self, identifier: &str) {
        let mut store = self.lock_store();
        let removed = store
            .keys()
            .into_iter()
            .filter(|key| belongs_to(key, identifier))
            .filter(|key| store.delete(key))
            .count();
        debug!(identifier, removed, "Reset rate limit buckets");
    }

    /// Reports the current slice's count for `identifier` without recording a
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError`] if `window` is malformed.
    pub fn get_usage(&self, identifier: &str, window: &str) -> Result<Usage, WindowError> {
        let window = Window::parse(window)?;
        let now = self.clock.now_ms();
        let key = bucket_key(identifier, window.index_at(now));

        let usage = match self.lock_store().get(&key) {
            Some(bucket) if !bucket.is_expired(now) => Usage {
                current: bucket.count,
                reset_time: Some(bucket.reset_time),
            },
            _ => Usage {
                current: 0,
                reset_time: None,
            },
        };
        Ok(usage)
    }

    /// Removes every bucket whose reset time has passed.
    ///
    /// Returns the number of buckets removed. This is a full scan; run it
    /// from a periodic task rather than per request.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut store = self.lock_store();
        let expired: Vec<String> = store
            .keys()
            .into_iter()
            .filter(|key| store.get(key).is_some_and(|bucket| bucket.is_expired(now)))
            .collect();

        for key in &expired {
            store.delete(key);
        }
        if !expired.is_empty() {
            debug!(removed = expired.len(), "Swept expired buckets");
        }
        expired.len()
    }

    /// Number of buckets currently stored.
    pub fn bucket_count(&self) -> usize {
        self.lock_store().keys().len()
    }

    fn lock_store(&self) -> MutexGuard<'_, S> {
        // Store operations can't leave a bucket half-written.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn bucket_key(identifier: &str, index: u64) -> String {
    format!("{identifier}:{index}")
}

/// Matches every key under the `<identifier>:` prefix. Identifiers that
/// extend `identifier` past a `:` share that prefix and are matched too.
fn belongs_to(key: &str, identifier: &str) -> bool {
    key.strip_prefix(identifier).is_some_and(|rest| rest.starts_with(':'))
}

fn drop_if_expired<S: BucketStore + ?Sized>(store: &mut S, key: &str, now: u64) {
    if store.get(key).is_some_and(|bucket| bucket.is_expired(now)) {
        store.delete(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter_at(now_ms: u64) -> (RateLimiter<MemoryStore, ManualClock>, ManualClock) {
        let clock = ManualClock::new(now_ms);
        (
            RateLimiter::with_store_and_clock(MemoryStore::new(), clock.clone()),
            clock,
        )
    }

    #[test]
    fn admits_up_to_quota_then_rejects() {
        let (limiter, _clock) = limiter_at(1_700_000_000_000);
        let policy = RateLimitPolicy::new(5, "1m").with_message("Too many requests");

        for expected_remaining in (0..5).rev() {
            let result = limiter.limit("203.0.113.7", &policy).unwrap();
            assert!(result.success);
            assert_eq!(result.limit, 5);
            assert_eq!(result.remaining, expected_remaining);
            assert_eq!(result.message, None);
        }

        for _ in 0..3 {
            let result = limiter.limit("203.0.113.7", &policy).unwrap();
            assert!(!result.success);
            assert_eq!(result.remaining, 0);
            assert_eq!(result.message.as_deref(), Some("Too many requests"));
        }

        assert_eq!(limiter.get_usage("203.0.113.7", "1m").unwrap().current, 5);
    }

    #[test]
    fn window_rolls_over() {
        let (limiter, clock) = limiter_at(0);
        let policy = RateLimitPolicy::new(1, "1s");

        assert!(limiter.limit("x", &policy).unwrap().success);

        clock.set(500);
        assert!(!limiter.limit("x", &policy).unwrap().success);

        clock.set(1_100);
        assert!(limiter.limit("x", &policy).unwrap().success);
    }

    #[test]
    fn reset_time_is_window_after_first_call() {
        let (limiter, clock) = limiter_at(250);
        let policy = RateLimitPolicy::new(2, "1s");

        let first = limiter.limit("x", &policy).unwrap();
        clock.set(400);
        let second = limiter.limit("x", &policy).unwrap();

        assert_eq!(first.reset, 1_250);
        assert_eq!(second.reset, 1_250);
    }

    #[test]
    fn allows_burst_across_window_boundary() {
        let (limiter, clock) = limiter_at(59_000);
        let policy = RateLimitPolicy::new(3, "1m");

        for _ in 0..3 {
            assert!(limiter.limit("burst", &policy).unwrap().success);
        }
        assert!(!limiter.limit("burst", &policy).unwrap().success);

        // One second later a new slice begins with a fresh quota.
        clock.set(60_000);
        for _ in 0..3 {
            assert!(limiter.limit("burst", &policy).unwrap().success);
        }
        assert!(!limiter.limit("burst", &policy).unwrap().success);
    }

    #[test]
    fn identifiers_are_independent() {
        let (limiter, _clock) = limiter_at(0);
        let policy = RateLimitPolicy::new(2, "1h");

        assert!(limiter.limit("a", &policy).unwrap().success);
        assert!(limiter.limit("a", &policy).unwrap().success);
        assert!(!limiter.limit("a", &policy).unwrap().success);

        let result = limiter.limit("b", &policy).unwrap();
        assert!(result.success);
        assert_eq!(result.remaining, 1);
    }

    #[test]
    fn reset_clears_identifier() {
        let (limiter, _clock) = limiter_at(0);
        let policy = RateLimitPolicy::new(1, "15m");

        assert!(limiter.limit("x", &policy).unwrap().success);
        assert!(!limiter.limit("x", &policy).unwrap().success);

        limiter.reset("x");
        assert!(limiter.limit("x", &policy).unwrap().success);
    }

    #[test]
    fn reset_is_idempotent() {
        let (limiter, _clock) = limiter_at(0);

        limiter.reset("nobody");
        limiter.reset("nobody");
        assert_eq!(limiter.bucket_count(), 0);
    }

    #[test]
    fn reset_clears_nested_identifiers_but_not_longer_names() {
        let (limiter, _clock) = limiter_at(0);
        let policy = RateLimitPolicy::new(1, "1h");

        limiter.limit("user", &policy).unwrap();
        limiter.limit("user:42", &policy).unwrap();
        limiter.limit("username", &policy).unwrap();

        limiter.reset("user");

        assert_eq!(limiter.get_usage("user", "1h").unwrap().current, 0);
        assert_eq!(limiter.get_usage("user:42", "1h").unwrap().current, 0);
        assert_eq!(limiter.get_usage("username", "1h").unwrap().current, 1);
        assert_eq!(limiter.bucket_count(), 1);

        limiter.reset("user:42");
        assert_eq!(limiter.get_usage("username", "1h").unwrap().current, 1);
    }

    #[test]
    fn reset_removes_buckets_for_every_window() {
        let (limiter, clock) = limiter_at(0);
        limiter.limit("x", &RateLimitPolicy::new(1, "1d")).unwrap();
        clock.set(5_000);
        limiter.limit("x", &RateLimitPolicy::new(1, "1s")).unwrap();
        clock.set(10_000);
        limiter.limit("x", &RateLimitPolicy::new(1, "1s")).unwrap();
        limiter.limit("y", &RateLimitPolicy::new(1, "1s")).unwrap();
        assert_eq!(limiter.bucket_count(), 4);

        limiter.reset("x");
        assert_eq!(limiter.bucket_count(), 1);
        assert_eq!(limiter.get_usage("y", "1s").unwrap().current, 1);
    }

    #[test]
    fn get_usage_does_not_mutate() {
        let (limiter, _clock) = limiter_at(0);
        let policy = RateLimitPolicy::new(3, "1h");

        assert_eq!(
            limiter.get_usage("x", "1h").unwrap(),
            Usage {
                current: 0,
                reset_time: None
            }
        );
        assert_eq!(limiter.bucket_count(), 0);

        limiter.limit("x", &policy).unwrap();
        let first = limiter.get_usage("x", "1h").unwrap();
        let second = limiter.get_usage("x", "1h").unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            Usage {
                current: 1,
                reset_time: Some(3_600_000)
            }
        );

        assert_eq!(limiter.limit("x", &policy).unwrap().remaining, 1);
    }

    #[test]
    fn rejects_malformed_window() {
        let (limiter, _clock) = limiter_at(0);

        let result = limiter.limit("x", &RateLimitPolicy::new(5, "abc"));
        assert!(matches!(result, Err(WindowError::Malformed { .. })));
        assert!(limiter.get_usage("x", "abc").is_err());
        assert_eq!(limiter.bucket_count(), 0);
    }

    #[test]
    fn zero_quota_rejects_without_creating_bucket() {
        let (limiter, _clock) = limiter_at(0);

        let result = limiter.limit("x", &RateLimitPolicy::new(0, "1m")).unwrap();
        assert!(!result.success);
        assert_eq!(result.reset, 60_000);
        assert_eq!(limiter.bucket_count(), 0);
    }

    #[test]
    fn previous_slice_is_dropped_on_access() {
        let (limiter, clock) = limiter_at(0);
        let policy = RateLimitPolicy::new(1, "1s");

        limiter.limit("x", &policy).unwrap();
        clock.set(1_100);
        limiter.limit("x", &policy).unwrap();

        assert_eq!(limiter.bucket_count(), 1);
    }

    #[test]
    fn sweep_removes_only_expired_buckets() {
        let (limiter, clock) = limiter_at(0);

        limiter.limit("short", &RateLimitPolicy::new(1, "1s")).unwrap();
        limiter.limit("long", &RateLimitPolicy::new(1, "1h")).unwrap();

        clock.set(1_000);
        assert_eq!(limiter.sweep_expired(), 0);

        clock.set(1_001);
        assert_eq!(limiter.sweep_expired(), 1);
        assert_eq!(limiter.bucket_count(), 1);
        assert_eq!(limiter.get_usage("long", "1h").unwrap().current, 1);
    }

    #[test]
    fn belongs_to_matches_identifier_prefix() {
        assert!(belongs_to("user:12", "user"));
        assert!(belongs_to("user:42:12", "user"));
        assert!(belongs_to("user:42:12", "user:42"));
        assert!(!belongs_to("username:12", "user"));
        assert!(!belongs_to("user", "user"));
        assert!(!belongs_to("user:12", "user:42"));
    }
}
