//! Surrogate-key dual index.
//!
//! A surrogate key is an opaque tag attached to cached URLs so that one tag
//! can invalidate many URLs at once. This crate keeps two mirrored indexes in
//! a single [`Store`]:
//!
//! - **forward**: key digest → the URLs it names
//! - **reverse**: URL digest → the keys naming it
//!
//! Keys and URLs are never stored in the clear; both are reduced to a short
//! [`Digest`] by a domain-separated [`Hasher`].
//!
//! The three operations are [`ingest`](ingest::ingest) (load `<url> <key>...`
//! records in batches, honouring a per-key fan-out cap),
//! [`purge`](purge::purge) (cascading invalidation of a key and every key
//! sharing a URL with it), and [`scan`](inspect::scan) (per-key counts over a
//! read snapshot). [`verify`](inspect::verify) cross-checks both indexes.

pub mod digest;
pub mod ingest;
pub mod inspect;
mod maintain;
pub mod purge;
pub mod store;

pub use crate::digest::{DIGEST_LEN, Digest, Hasher, KeyInput};
pub use crate::ingest::{IngestEvent, IngestOptions, IngestStats, Record, RecordReader, ingest};
pub use crate::inspect::{ConsistencyReport, KeyCount, Scan, Side, Summary, scan, verify};
pub use crate::maintain::Outcome;
pub use crate::purge::{PurgeReport, UrlPurge, purge};
pub use crate::store::{IndexTables, Session, Store, StoreOptions};

/// Maximum URLs a single key may name; further associations are dropped.
pub const DEFAULT_FANOUT_CAP: u64 = 100_000;
/// Accepted records per write transaction during ingestion.
pub const DEFAULT_COMMIT_INTERVAL: u64 = 10_000;
/// Accepted records between progress reports during ingestion.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;
/// Longest accepted input line, in bytes, excluding the terminator.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 500;
