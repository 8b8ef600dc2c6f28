//! Error types shared by hanabot crates.

use thiserror::Error;

/// Result type alias using the hanabot error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration validation failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid value for a configuration field
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Several validation failures at once
    #[error("Multiple configuration errors: {0:?}")]
    Multiple(Vec<Error>),
}

impl Error {
    /// Shorthand for an invalid field value.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
