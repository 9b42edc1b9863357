//! The store file and its two duplicate-sorted index tables.
//!
//! The store is a single `redb` database holding two multimap tables:
//!
//! - `forward`: key digest → url digests
//! - `reverse`: url digest → key digests
//!
//! Both tables use fixed-width `&[u8; DIGEST_LEN]` keys and values, so the
//! store keeps every value sorted and deduplicated per key. Writes happen
//! through a [`Session`], which owns exactly one write transaction; the
//! [`IndexTables`] borrowed from a session cannot outlive it, so table handles
//! are always reacquired after a commit.

pub mod error;
mod tables;

use crate::digest::DIGEST_LEN;
use crate::store::error::{ErrorKind, Result};
use exn::ResultExt;
use redb::backends::InMemoryBackend;
use redb::{Database, MultimapTableDefinition, ReadTransaction, WriteTransaction};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use tracing::instrument;

pub use crate::store::tables::IndexTables;

/// How digests are laid out on disk: raw, fixed width.
pub(crate) type RawDigest = &'static [u8; DIGEST_LEN];

pub(crate) const FORWARD: MultimapTableDefinition<&[u8; DIGEST_LEN], &[u8; DIGEST_LEN]> =
    MultimapTableDefinition::new("forward");
pub(crate) const REVERSE: MultimapTableDefinition<&[u8; DIGEST_LEN], &[u8; DIGEST_LEN]> =
    MultimapTableDefinition::new("reverse");

/// Tunables applied when opening the store file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Page cache size in bytes; `None` keeps the redb default.
    pub cache_size: Option<usize>,
}

/// Handle to an open store file.
///
/// Only one [`Session`] (write transaction) can be live at a time; a second
/// call to [`session`](Self::session) blocks until the first is committed or
/// dropped. Read snapshots never block.
pub struct Store {
    db: Database,
    path: Option<PathBuf>,
}

impl Debug for Store {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Store").field("path", &self.path).finish_non_exhaustive()
    }
}

impl Store {
    /// Open the store at `path`, creating the file and both index tables if
    /// they don't exist yet.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut builder = Database::builder();
        if let Some(bytes) = options.cache_size {
            builder.set_cache_size(bytes);
        }
        let db = builder.create(path).or_raise(|| ErrorKind::Open(path.to_path_buf()))?;
        let store = Self {
            db,
            path: Some(path.to_path_buf()),
        };
        store.create_tables()?;
        tracing::info!(path = %path.display(), "Opened surrogate-key store");
        Ok(store)
    }

    /// Open a store that lives only in memory (useful for testing).
    ///
    /// Not gated behind `#[cfg(test)]` so other crates can use it in their
    /// own tests.
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .or_raise(|| ErrorKind::Open(PathBuf::from(":memory:")))?;
        let store = Self { db, path: None };
        store.create_tables()?;
        Ok(store)
    }

    /// Location of the store file, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn create_tables(&self) -> Result<()> {
        let session = self.session()?;
        session.txn.open_multimap_table(FORWARD).or_raise(|| ErrorKind::Table)?;
        session.txn.open_multimap_table(REVERSE).or_raise(|| ErrorKind::Table)?;
        session.commit()
    }

    /// Begin a write session. Blocks while another session is live.
    pub fn session(&self) -> Result<Session> {
        let txn = self.db.begin_write().or_raise(|| ErrorKind::Transaction)?;
        Ok(Session { txn })
    }

    /// Begin a read-only snapshot of both tables.
    pub(crate) fn snapshot(&self) -> Result<ReadTransaction> {
        self.db.begin_read().or_raise(|| ErrorKind::Transaction)
    }
}

/// One write transaction against the store.
///
/// Dropping a session without calling [`commit`](Self::commit) discards every
/// write made through it.
pub struct Session {
    txn: WriteTransaction,
}

impl Session {
    /// Open both index tables inside this transaction.
    pub fn tables(&self) -> Result<IndexTables<'_>> {
        IndexTables::open(&self.txn)
    }

    /// Make every write in this session durable and visible to new snapshots.
    pub fn commit(self) -> Result<()> {
        self.txn.commit().or_raise(|| ErrorKind::Commit)
    }

    /// Discard every write in this session.
    pub fn abort(self) -> Result<()> {
        self.txn.abort().or_raise(|| ErrorKind::Commit)
    }
}
