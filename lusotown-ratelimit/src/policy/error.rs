//! Policy configuration error types.

use thiserror::Error;

/// Errors that can occur while loading or looking up policies.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML content.
    #[error("Failed to parse policy file '{path}': {source}")]
    TomlError {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// A policy entry is invalid.
    #[error("Validation error in '{path}': {message}")]
    ValidationError { path: String, message: String },

    /// No policy with this name exists.
    #[error("Unknown rate limit policy: {name}")]
    UnknownPolicy { name: String },
}
