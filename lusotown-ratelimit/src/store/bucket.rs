//! Window bucket record.

/// Call counter for one identifier within one window slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBucket {
    /// Successful calls recorded in this slice.
    pub count: u32,

    /// Epoch milliseconds after which the bucket is stale.
    pub reset_time: u64,
}

impl WindowBucket {
    /// Creates an empty bucket that resets at `reset_time`.
    #[must_use]
    pub fn new(reset_time: u64) -> Self {
        Self {
            count: 0,
            reset_time,
        }
    }

    /// Returns true once `now_ms` is past the reset time.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.reset_time < now_ms
    }
}
