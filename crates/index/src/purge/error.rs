//! Error types for the [`purge`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use crate::digest::Digest;
use derive_more::{Display, Error};

/// A purge error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for purge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies a purge failure.
///
/// A forward/reverse mismatch found while purging is *not* an error; it is
/// logged and counted in the [`PurgeReport`](super::PurgeReport).
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The target key names no URLs, so there is nothing to purge.
    #[display("key not found: {_0}")]
    KeyNotFound(#[error(not(source))] Digest),
    /// The store rejected a read, write or commit. URLs purged before the
    /// failure stay purged.
    #[display("store operation failed")]
    Store,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
