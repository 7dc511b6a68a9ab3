#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod clock;
pub mod community;
pub mod error;
pub mod limiter;
pub mod messages;
pub mod policy;
pub mod store;
pub mod sweeper;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use community::{
    adjusted_requests, CommunityContext, CommunityRateLimiter, CommunityStanding,
    MembershipLevel, ParseContextError,
};
pub use error::Error;
pub use limiter::{RateLimitResult, RateLimiter, Usage};
pub use messages::{
    get_rate_limit_message, Language, MessageError, MessageRenderer, UnsupportedLanguage,
};
pub use policy::{resolve_policy_table, ConfigError, PolicyTable, RateLimitPolicy, POLICIES_ENV};
pub use store::{BucketStore, MemoryStore, WindowBucket};
pub use sweeper::{spawn_sweeper, SweepExpired};
pub use window::{Window, WindowError};
