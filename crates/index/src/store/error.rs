//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. The underlying `redb` error is kept
//! as the child frame of every variant.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Anything raised from here means the store file is corrupt, locked by
/// another process, or out of resources. None of it is a normal outcome of
/// adding or removing an association.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The store file could not be created or opened.
    #[display("failed to open store: {}", _0.display())]
    Open(#[error(not(source))] PathBuf),
    /// A read or write transaction could not be started.
    #[display("failed to begin transaction")]
    Transaction,
    /// One of the index tables could not be opened.
    #[display("failed to open index table")]
    Table,
    /// Reading an index table failed.
    #[display("failed to read index table")]
    Read,
    /// Inserting into or deleting from an index table failed.
    #[display("failed to write index table")]
    Write,
    /// The transaction could not be committed; nothing from it is durable.
    #[display("failed to commit transaction")]
    Commit,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Another process holding the file lock is the only transient case.
        matches!(self, Self::Open(_))
    }
}
