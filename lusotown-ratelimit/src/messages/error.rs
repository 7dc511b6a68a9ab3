//! Message error types.

/// Errors raised while producing a retry message.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// Handlebars rendering error.
    #[error("Message rendering error: {0}")]
    RenderError(#[from] handlebars::RenderError),

    /// Template registration error.
    #[error("Message template registration error: {0}")]
    RegistrationError(#[from] handlebars::TemplateError),
}

/// Error for language tags other than English or Portuguese.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported language '{0}'; expected 'en' or 'pt'")]
pub struct UnsupportedLanguage(pub String);
