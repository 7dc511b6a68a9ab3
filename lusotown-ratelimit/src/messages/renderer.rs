//! Retry message renderer.

use super::{Language, MessageError};
use crate::limiter::RateLimitResult;
use handlebars::{no_escape, Handlebars};
use serde_json::json;

const MINUTE_MS: u64 = 60_000;

const EN_MINUTE: &str = "Too many requests. Please try again in a minute.";
const EN_MINUTES: &str = "Too many requests. Please try again in {{minutes}} minutes.";
const EN_HOURS: &str =
    "Too many requests. Please try again in {{hours}} {{#if plural}}hours{{else}}hour{{/if}}.";

const PT_MINUTE: &str = "Demasiados pedidos. Por favor, tente novamente dentro de um minuto.";
const PT_MINUTES: &str =
    "Demasiados pedidos. Por favor, tente novamente dentro de {{minutes}} minutos.";
const PT_HOURS: &str = "Demasiados pedidos. Por favor, tente novamente dentro de {{hours}} {{#if plural}}horas{{else}}hora{{/if}}.";

/// Creates a Handlebars registry for plain-text messages.
///
/// Escaping is off and strict mode is on, so a template referring to an
/// unknown variable fails instead of rendering a blank.
#[must_use]
pub fn create_handlebars_registry() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();
    hbs.register_escape_fn(no_escape);
    hbs.set_strict_mode(true);
    hbs
}

/// Magnitude of the wait, which picks the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    Minute,
    Minutes,
    Hours,
}

impl Wait {
    const ALL: [Self; 3] = [Self::Minute, Self::Minutes, Self::Hours];

    fn from_minutes(minutes: u64) -> Self {
        if minutes <= 1 {
            Self::Minute
        } else if minutes < 60 {
            Self::Minutes
        } else {
            Self::Hours
        }
    }
}

/// Registered name and source of the template for each language and wait.
fn template(language: Language, wait: Wait) -> (&'static str, &'static str) {
    match (language, wait) {
        (Language::En, Wait::Minute) => ("en.minute", EN_MINUTE),
        (Language::En, Wait::Minutes) => ("en.minutes", EN_MINUTES),
        (Language::En, Wait::Hours) => ("en.hours", EN_HOURS),
        (Language::Pt, Wait::Minute) => ("pt.minute", PT_MINUTE),
        (Language::Pt, Wait::Minutes) => ("pt.minutes", PT_MINUTES),
        (Language::Pt, Wait::Hours) => ("pt.hours", PT_HOURS),
    }
}

/// Renders localized retry messages.
pub struct MessageRenderer {
    handlebars: Handlebars<'static>,
}

impl MessageRenderer {
    /// Creates a renderer with every retry template registered by name.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::RegistrationError`] if a template fails to parse.
    pub fn new() -> Result<Self, MessageError> {
        let mut handlebars = create_handlebars_registry();
        for language in [Language::En, Language::Pt] {
            for wait in Wait::ALL {
                let (name, source) = template(language, wait);
                handlebars.register_template_string(name, source)?;
            }
        }
        Ok(Self { handlebars })
    }

    /// Renders the retry message for `result` as seen at `now_ms`.
    ///
    /// The wait is rounded up to whole minutes. One minute or less reads as
    /// "a minute", under an hour as a number of minutes, and anything longer
    /// as whole hours, rounded up.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError`] if rendering fails.
    pub fn render_at(
        &self,
        result: &RateLimitResult,
        language: Language,
        now_ms: u64,
    ) -> Result<String, MessageError> {
        let minutes = result.reset.saturating_sub(now_ms).div_ceil(MINUTE_MS);
        let hours = minutes.div_ceil(60);
        let (name, _) = template(language, Wait::from_minutes(minutes));

        let data = json!({
            "minutes": minutes,
            "hours": hours,
            "plural": hours != 1,
            "limit": result.limit,
        });
        Ok(self.handlebars.render(name, &data)?)
    }
}
