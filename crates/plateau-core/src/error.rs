//! # Core Error Types
//!
//! Validation failures raised by the pure building blocks of this crate.
//! None of them involve I/O; every variant describes bad caller input.

use thiserror::Error;

/// Error raised while validating keys, purpose tags, or cursors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A subject name or other required input was empty or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The purpose tag is not one of the recognized tags.
    #[error("unsupported purpose tag: {0:?}")]
    UnsupportedPurpose(String),

    /// A pagination cursor could not be decoded.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

impl CoreError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::UnsupportedPurpose(_) => "unsupported_purpose",
            Self::InvalidCursor(_) => "invalid_cursor",
        }
    }
}
