//! Window duration grammar.
//!
//! Windows are written as `<integer><unit>` where the unit is one of
//! `s`, `m`, `h` or `d`, e.g. `30s`, `15m`, `1h`, `7d`.

use std::str::FromStr;
use thiserror::Error;

const SECOND_MS: u64 = 1_000;
const MINUTE_MS: u64 = 60 * SECOND_MS;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Errors raised for window strings that don't follow the duration grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// The string is not `<integer><s|m|h|d>`.
    #[error("Invalid window '{window}': expected <integer><s|m|h|d>, e.g. '15m'")]
    Malformed { window: String },

    /// The window has zero length.
    #[error("Invalid window '{window}': duration must be greater than zero")]
    Zero { window: String },

    /// The window does not fit in 64-bit milliseconds.
    #[error("Invalid window '{window}': duration is too large")]
    Overflow { window: String },
}

/// A parsed, non-zero window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    millis: u64,
}

impl Window {
    /// Parses a window string such as `15m`.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError`] if the string doesn't match `<integer><s|m|h|d>`,
    /// describes a zero-length window, or overflows.
    pub fn parse(window: &str) -> Result<Self, WindowError> {
        let malformed = || WindowError::Malformed {
            window: window.to_string(),
        };

        let multiplier = match window.chars().last().ok_or_else(malformed)? {
            's' => SECOND_MS,
            'm' => MINUTE_MS,
            'h' => HOUR_MS,
            'd' => DAY_MS,
            _ => return Err(malformed()),
        };

        // Unit is a single ASCII byte.
        let digits = &window[..window.len() - 1];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let overflow = || WindowError::Overflow {
            window: window.to_string(),
        };
        let amount: u64 = digits.parse().map_err(|_| overflow())?;
        if amount == 0 {
            return Err(WindowError::Zero {
                window: window.to_string(),
            });
        }

        let millis = amount.checked_mul(multiplier).ok_or_else(overflow)?;
        Ok(Self { millis })
    }

    /// Window length in milliseconds.
    #[must_use]
    pub fn as_millis(self) -> u64 {
        self.millis
    }

    /// Index of the window slice containing `now_ms`.
    ///
    /// Slices are contiguous and aligned to the Unix epoch.
    #[must_use]
    pub fn index_at(self, now_ms: u64) -> u64 {
        now_ms / self.millis
    }
}

impl FromStr for Window {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
