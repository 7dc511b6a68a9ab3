//! Rate limit policies and the named policy table.

mod error;
mod table;

pub use error::ConfigError;
pub use table::{resolve_policy_table, PolicyTable, POLICIES_ENV};

use crate::window::{Window, WindowError};
use serde::{Deserialize, Serialize};

/// A quota rule: at most `requests` calls per `window`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RateLimitPolicy {
    /// Maximum calls permitted in one window slice.
    pub requests: u32,

    /// Window length, e.g. `15m`.
    pub window: String,

    /// Message attached to rejected results (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RateLimitPolicy {
    /// Creates a policy without a rejection message.
    pub fn new(requests: u32, window: impl Into<String>) -> Self {
        Self {
            requests,
            window: window.into(),
            message: None,
        }
    }

    /// Sets the message attached to rejected results.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns a copy of this policy with a different request ceiling.
    #[must_use]
    pub fn with_requests(&self, requests: u32) -> Self {
        Self {
            requests,
            ..self.clone()
        }
    }

    /// Parses the window string.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError`] if the window doesn't follow the duration grammar.
    pub fn parsed_window(&self) -> Result<Window, WindowError> {
        Window::parse(&self.window)
    }
}
