//! Error types for the [`ingest`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};

/// An ingestion error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies an ingestion failure.
///
/// ### Record Errors (reported, ingestion continues)
/// - [`ErrorKind::LineTooLong`]
/// - [`ErrorKind::MissingKeys`]
///
/// ### Fatal Errors (the open transaction is discarded, the run stops)
/// - [`ErrorKind::Input`]
/// - [`ErrorKind::Store`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A line was longer than the configured limit. The whole line was
    /// skipped; nothing from it was hashed.
    #[display("line {line} is {length} bytes, longer than the {limit} byte limit")]
    LineTooLong { line: u64, length: usize, limit: usize },
    /// A line held a URL but no keys.
    #[display("line {line} has a URL but no keys")]
    MissingKeys { line: u64 },
    /// Reading the record stream failed.
    #[display("failed to read input")]
    Input,
    /// The store rejected a write or commit.
    #[display("store operation failed")]
    Store,
}

impl ErrorKind {
    /// Returns `true` if the run cannot continue past this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Input | Self::Store)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
