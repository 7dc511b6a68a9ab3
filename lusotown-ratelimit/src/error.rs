//! Crate-level error type.

/// Errors from looking up a policy, limiting a call and rendering its message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Policy file or lookup errors.
    #[error(transparent)]
    Config(#[from] crate::policy::ConfigError),

    /// Malformed window strings.
    #[error(transparent)]
    Window(#[from] crate::window::WindowError),

    /// Retry message errors.
    #[error(transparent)]
    Message(#[from] crate::messages::MessageError),
}
