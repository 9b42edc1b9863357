//! Digest Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A digest construction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for digest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Raw bytes were supplied with the wrong width. Digests are never
    /// truncated or padded to fit.
    #[display("invalid digest length: expected {expected} bytes, found {actual}")]
    InvalidLength { expected: usize, actual: usize },
    /// A pre-hashed key was not a hex string of the canonical width.
    #[display("invalid hex digest: {_0:?}")]
    InvalidHex(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Same input, same answer.
        false
    }
}
