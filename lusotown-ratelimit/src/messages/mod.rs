//! Localized retry messages for rejected calls.

mod error;
mod renderer;

pub use error::{MessageError, UnsupportedLanguage};
pub use renderer::{create_handlebars_registry, MessageRenderer};

use crate::clock::{Clock, SystemClock};
use crate::limiter::RateLimitResult;
use std::fmt;
use std::str::FromStr;

/// Display language for retry messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Language {
    #[default]
    En,
    Pt,
}

impl Language {
    /// Two-letter language code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Pt => "pt",
        }
    }
}

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    /// Accepts bare codes and regional tags such as `pt-BR` or `en_GB`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Ok(Self::En),
            "pt" => Ok(Self::Pt),
            _ => Err(UnsupportedLanguage(s.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a human-readable retry notice for `result` using the wall clock.
///
/// # Errors
///
/// Returns [`MessageError`] if a template fails to register or render.
pub fn get_rate_limit_message(
    result: &RateLimitResult,
    language: Language,
) -> Result<String, MessageError> {
    MessageRenderer::new()?.render_at(result, language, SystemClock.now_ms())
}
