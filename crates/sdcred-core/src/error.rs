//! # Error Types
//!
//! Errors raised by the foundational types. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// The value could not be converted to a JSON tree or serialized by JCS.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A value failed validation at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An identifier was empty or contained only whitespace.
    #[error("{kind} must not be empty")]
    EmptyIdentifier {
        /// Which identifier type was being constructed.
        kind: &'static str,
    },

    /// An identifier contained characters that are not allowed.
    #[error("{kind} {value:?} contains whitespace or control characters")]
    InvalidCharacters {
        /// Which identifier type was being constructed.
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// An identifier exceeded the maximum length.
    #[error("{kind} exceeds {max} bytes (got {len})")]
    TooLong {
        /// Which identifier type was being constructed.
        kind: &'static str,
        /// Maximum permitted length in bytes.
        max: usize,
        /// Actual length in bytes.
        len: usize,
    },

    /// A timestamp string or epoch value could not be interpreted.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
