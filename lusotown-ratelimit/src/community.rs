//! Community-aware quotas.
//!
//! Trusted members get more headroom and members under a warning get less.
//! The adjustment only changes the ceiling passed to [`RateLimiter::limit`];
//! buckets are shared with plain calls for the same identifier, so raising a
//! member's ceiling mid-window takes effect on their next call.

use crate::clock::{Clock, SystemClock};
use crate::limiter::{RateLimitResult, RateLimiter, Usage};
use crate::policy::RateLimitPolicy;
use crate::store::{BucketStore, MemoryStore};
use crate::window::WindowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

const VERIFIED_MULTIPLIER: f64 = 1.5;
const PREMIUM_MULTIPLIER: f64 = 2.0;
const AMBASSADOR_MULTIPLIER: f64 = 3.0;
const HIGH_CULTURAL_SCORE: u32 = 80;
const CULTURAL_MULTIPLIER: f64 = 1.25;
const WARNING_MULTIPLIER: f64 = 0.5;

/// Error for unrecognised membership or standing names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind} '{value}'")]
pub struct ParseContextError {
    kind: &'static str,
    value: String,
}

/// Membership tier of a community member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipLevel {
    Free,
    Community,
    Student,
    Premium,
    Ambassador,
}

impl MembershipLevel {
    /// Lowercase name as used in configuration and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Community => "community",
            Self::Student => "student",
            Self::Premium => "premium",
            Self::Ambassador => "ambassador",
        }
    }
}

impl FromStr for MembershipLevel {
    type Err = ParseContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "community" => Ok(Self::Community),
            "student" => Ok(Self::Student),
            "premium" => Ok(Self::Premium),
            "ambassador" => Ok(Self::Ambassador),
            _ => Err(ParseContextError {
                kind: "membership level",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MembershipLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderation standing of a community member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunityStanding {
    Good,
    Warning,
    /// Suspension is enforced elsewhere; it doesn't change the quota here.
    Suspended,
}

impl CommunityStanding {
    /// Lowercase name as used in configuration and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Suspended => "suspended",
        }
    }
}

impl FromStr for CommunityStanding {
    type Err = ParseContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "good" => Ok(Self::Good),
            "warning" => Ok(Self::Warning),
            "suspended" => Ok(Self::Suspended),
            _ => Err(ParseContextError {
                kind: "community standing",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for CommunityStanding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trust signals supplied by the caller's session or user service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommunityContext {
    /// Identity has been verified.
    pub is_verified: bool,

    /// Membership tier, if known.
    pub membership_level: Option<MembershipLevel>,

    /// Cultural engagement score (0-100).
    pub cultural_score: Option<u32>,

    /// Moderation standing, if known.
    pub community_standing: Option<CommunityStanding>,
}

/// Scales `requests` by the member's trust signals.
///
/// Multipliers apply in a fixed order, each result floored before the next
/// step: verified ×1.5, premium ×2 or ambassador ×3, cultural score ≥ 80
/// ×1.25, warning standing ×0.5. With `requests = 5`, verified and a high
/// cultural score give `floor(floor(5 × 1.5) × 1.25) = 8`, not 9.
#[must_use]
pub fn adjusted_requests(requests: u32, context: &CommunityContext) -> u32 {
    let mut adjusted = requests;

    if context.is_verified {
        adjusted = scale(adjusted, VERIFIED_MULTIPLIER);
    }

    match context.membership_level {
        Some(MembershipLevel::Premium) => adjusted = scale(adjusted, PREMIUM_MULTIPLIER),
        Some(MembershipLevel::Ambassador) => adjusted = scale(adjusted, AMBASSADOR_MULTIPLIER),
        _ => {}
    }

    if context
        .cultural_score
        .is_some_and(|score| score >= HIGH_CULTURAL_SCORE)
    {
        adjusted = scale(adjusted, CULTURAL_MULTIPLIER);
    }

    if context.community_standing == Some(CommunityStanding::Warning) {
        adjusted = scale(adjusted, WARNING_MULTIPLIER);
    }

    adjusted
}

fn scale(requests: u32, factor: f64) -> u32 {
    // Float-to-int casts saturate.
    (f64::from(requests) * factor).floor() as u32
}

/// A [`RateLimiter`] that can widen or narrow quotas per member.
#[derive(Debug)]
pub struct CommunityRateLimiter<S = MemoryStore, C = SystemClock> {
    limiter: RateLimiter<S, C>,
}

impl CommunityRateLimiter {
    /// Creates a limiter with an in-memory store and the wall clock.
    ///
    /// Like [`RateLimiter::new`], this starts no background cleanup. Pass the
    /// limiter to [`spawn_sweeper`](crate::sweeper::spawn_sweeper) to drop
    /// buckets of identifiers that stop calling.
    #[must_use]
    pub fn new() -> Self {
        Self::from_limiter(RateLimiter::new())
    }
}

impl Default for CommunityRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BucketStore, C: Clock> CommunityRateLimiter<S, C> {
    /// Wraps an existing limiter.
    pub fn from_limiter(limiter: RateLimiter<S, C>) -> Self {
        Self { limiter }
    }

    /// Returns the underlying limiter.
    pub fn limiter(&self) -> &RateLimiter<S, C> {
        &self.limiter
    }

    /// Records a call against a ceiling scaled by `context`.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError`] if `policy.window` is malformed.
    pub fn limit_with_community_context(
        &self,
        identifier: &str,
        policy: &RateLimitPolicy,
        context: &CommunityContext,
    ) -> Result<RateLimitResult, WindowError> {
        let requests = adjusted_requests(policy.requests, context);
        if requests != policy.requests {
            debug!(
                identifier,
                base = policy.requests,
                adjusted = requests,
                "Applied community quota adjustment"
            );
        }
        self.limiter.limit(identifier, &policy.with_requests(requests))
    }

    /// See [`RateLimiter::limit`].
    ///
    /// # Errors
    ///
    /// Returns [`WindowError`] if `policy.window` is malformed.
    pub fn limit(
        &self,
        identifier: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitResult, WindowError> {
        self.limiter.limit(identifier, policy)
    }

    /// See [`RateLimiter::reset`].
    pub fn reset(&self, identifier: &str) {
        self.limiter.reset(identifier);
    }

    /// See [`RateLimiter::get_usage`].
    ///
    /// # Errors
    ///
    /// Returns [`WindowError`] if `window` is malformed.
    pub fn get_usage(&self, identifier: &str, window: &str) -> Result<Usage, WindowError> {
        self.limiter.get_usage(identifier, window)
    }

    /// See [`RateLimiter::sweep_expired`].
    pub fn sweep_expired(&self) -> usize {
        self.limiter.sweep_expired()
    }
}
