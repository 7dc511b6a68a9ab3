//! Limiter outcome types.

use serde::Serialize;

/// Outcome of a single [`limit`](super::RateLimiter::limit) call.
///
/// A rejected call is a normal result with `success == false`, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitResult {
    /// Whether the call was admitted.
    pub success: bool,

    /// The ceiling that was enforced.
    pub limit: u32,

    /// Calls left in the current window slice.
    pub remaining: u32,

    /// Epoch milliseconds when the bucket resets.
    pub reset: u64,

    /// The policy message, only set on rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RateLimitResult {
    pub(crate) fn allowed(limit: u32, remaining: u32, reset: u64) -> Self {
        Self {
            success: true,
            limit,
            remaining,
            reset,
            message: None,
        }
    }

    pub(crate) fn rejected(limit: u32, reset: u64, message: Option<String>) -> Self {
        Self {
            success: false,
            limit,
            remaining: 0,
            reset,
            message,
        }
    }
}

/// Current consumption for one identifier, as reported by
/// [`get_usage`](super::RateLimiter::get_usage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    /// Calls counted in the current window slice.
    pub current: u32,

    /// When the current bucket resets, or `None` if no bucket exists yet.
    pub reset_time: Option<u64>,
}
