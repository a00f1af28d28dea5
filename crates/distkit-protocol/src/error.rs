//! Error types for protocol parsing and validation.

use thiserror::Error;

/// Errors raised while parsing platforms, keys or registry documents.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Platform string is not of the form `{os}-{arch}`.
    #[error("invalid platform '{0}': expected <os>-<arch>")]
    InvalidPlatform(String),

    /// A key component is empty.
    #[error("{field} must not be empty")]
    EmptyComponent { field: &'static str },

    /// A key component contains a character outside `[A-Za-z0-9.-]`.
    #[error("{field} '{value}' contains disallowed character {ch:?}")]
    DisallowedChar {
        field: &'static str,
        value: String,
        ch: char,
    },

    /// Digest has the wrong length.
    #[error("sha256 digest must be {expected} bytes, got {actual}")]
    DigestLength { expected: usize, actual: usize },
}
