use crate::digest::Digest;
use crate::store::error::{ErrorKind, Result};
use crate::store::{FORWARD, REVERSE, RawDigest};
use exn::ResultExt;
use redb::{MultimapTable, MultimapValue, ReadableMultimapTable, WriteTransaction};

/// Both index tables, opened inside one write transaction.
///
/// Borrowed from a [`Session`](crate::store::Session); it has to be dropped
/// before the session is committed, which means every batch and every purge
/// step opens its own.
pub struct IndexTables<'txn> {
    pub(crate) forward: MultimapTable<'txn, RawDigest, RawDigest>,
    pub(crate) reverse: MultimapTable<'txn, RawDigest, RawDigest>,
}

impl<'txn> IndexTables<'txn> {
    pub(crate) fn open(txn: &'txn WriteTransaction) -> Result<Self> {
        Ok(Self {
            forward: txn.open_multimap_table(FORWARD).or_raise(|| ErrorKind::Table)?,
            reverse: txn.open_multimap_table(REVERSE).or_raise(|| ErrorKind::Table)?,
        })
    }

    /// Number of URLs currently named by `key`.
    pub fn url_count(&self, key: &Digest) -> Result<u64> {
        Ok(self.forward.get(key.as_bytes()).or_raise(|| ErrorKind::Read)?.len())
    }

    /// Number of keys currently naming `url`.
    pub fn key_count(&self, url: &Digest) -> Result<u64> {
        Ok(self.reverse.get(url.as_bytes()).or_raise(|| ErrorKind::Read)?.len())
    }

    /// URLs named by `key`, in store order.
    pub fn urls(&self, key: &Digest) -> Result<Vec<Digest>> {
        collect(self.forward.get(key.as_bytes()).or_raise(|| ErrorKind::Read)?)
    }

    /// Keys naming `url`, in store order.
    pub fn keys(&self, url: &Digest) -> Result<Vec<Digest>> {
        collect(self.reverse.get(url.as_bytes()).or_raise(|| ErrorKind::Read)?)
    }

    /// The lowest-sorted URL still named by `key`.
    pub fn first_url(&self, key: &Digest) -> Result<Option<Digest>> {
        let mut urls = self.forward.get(key.as_bytes()).or_raise(|| ErrorKind::Read)?;
        urls.next()
            .transpose()
            .or_raise(|| ErrorKind::Read)
            .map(|guard| guard.map(|url| Digest::from(*url.value())))
    }

    /// Delete exactly `(key, url)` from the forward table. Returns `false` if
    /// the pair was not there. The key disappears with its last URL.
    pub fn remove_forward(&mut self, key: &Digest, url: &Digest) -> Result<bool> {
        self.forward.remove(key.as_bytes(), url.as_bytes()).or_raise(|| ErrorKind::Write)
    }

    /// Delete `url` and every key under it from the reverse table, returning
    /// how many keys were removed.
    pub fn remove_reverse(&mut self, url: &Digest) -> Result<u64> {
        Ok(self.reverse.remove_all(url.as_bytes()).or_raise(|| ErrorKind::Write)?.len())
    }
}

fn collect(values: MultimapValue<'_, RawDigest>) -> Result<Vec<Digest>> {
    values
        .map(|value| value.map(|guard| Digest::from(*guard.value())).or_raise(|| ErrorKind::Read))
        .collect()
}
