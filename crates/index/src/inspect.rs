//! Read-only views over a store snapshot.
//!
//! [`scan`] walks one table key by key, reporting how many values each key
//! holds. [`verify`] cross-checks both tables for bidirectionality and the
//! fan-out cap.

use crate::digest::{DIGEST_LEN, Digest};
use crate::store::error::{ErrorKind, Result};
use crate::store::{FORWARD, REVERSE, RawDigest, Store};
use exn::ResultExt;
use redb::{MultimapTableDefinition, ReadOnlyMultimapTable, ReadTransaction, ReadableMultimapTable};
use std::cmp::Ordering;
use std::ops::Bound;
use tracing::instrument;

/// Which index table to walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Side {
    /// key digest → url digests
    #[default]
    Forward,
    /// url digest → key digests
    Reverse,
}

impl Side {
    fn table(self) -> MultimapTableDefinition<'static, RawDigest, RawDigest> {
        match self {
            Self::Forward => FORWARD,
            Self::Reverse => REVERSE,
        }
    }
}

/// One key and the number of values stored under it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyCount {
    pub digest: Digest,
    pub count: u64,
}

/// Lazy, finite walk over one table of a single read snapshot, in ascending
/// key order. Writes committed after the scan started are not visible.
pub struct Scan {
    table: ReadOnlyMultimapTable<RawDigest, RawDigest>,
    last: Option<[u8; DIGEST_LEN]>,
    done: bool,
    // Held for the lifetime of the scan so the snapshot stays pinned.
    _snapshot: ReadTransaction,
}

impl Scan {
    fn step(&mut self) -> Result<Option<KeyCount>> {
        let last = self.last;
        let lower: Bound<&[u8; DIGEST_LEN]> = match &last {
            Some(last) => Bound::Excluded(last),
            None => Bound::Unbounded,
        };
        let mut range = self.table.range::<&[u8; DIGEST_LEN]>((lower, Bound::Unbounded)).or_raise(|| ErrorKind::Read)?;
        let Some(entry) = range.next() else {
            return Ok(None);
        };
        let (key, values) = entry.or_raise(|| ErrorKind::Read)?;
        let digest = *key.value();
        self.last = Some(digest);
        Ok(Some(KeyCount {
            digest: Digest::from(digest),
            count: values.len(),
        }))
    }
}

impl Iterator for Scan {
    type Item = Result<KeyCount>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let step = self.step();
        if !matches!(step, Ok(Some(_))) {
            self.done = true;
        }
        step.transpose()
    }
}

/// Open a snapshot and start walking `side`.
pub fn scan(store: &Store, side: Side) -> Result<Scan> {
    let snapshot = store.snapshot()?;
    let table = snapshot.open_multimap_table(side.table()).or_raise(|| ErrorKind::Table)?;
    Ok(Scan {
        table,
        last: None,
        done: false,
        _snapshot: snapshot,
    })
}

/// Totals over a scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub keys: u64,
    pub pairs: u64,
    /// Keys holding at least `fanout_cap` values.
    pub at_cap: u64,
}

impl Summary {
    pub fn add(&mut self, entry: &KeyCount, fanout_cap: u64) {
        self.keys += 1;
        self.pairs += entry.count;
        if entry.count >= fanout_cap {
            self.at_cap += 1;
        }
    }
}

/// Result of [`verify`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub forward_keys: u64,
    pub forward_pairs: u64,
    pub reverse_keys: u64,
    pub reverse_pairs: u64,
    /// `(key, url)` in forward without `(url, key)` in reverse.
    pub missing_reverse: u64,
    /// `(url, key)` in reverse without `(key, url)` in forward.
    pub missing_forward: u64,
    /// Forward keys holding more URLs than the fan-out cap.
    pub over_cap: u64,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_reverse == 0 && self.missing_forward == 0 && self.over_cap == 0
    }
}

/// Check both tables of one snapshot against each other.
///
/// Every forward pair is flipped and sorted, then merged against the reverse
/// table (which the store already yields sorted), so memory grows with the
/// number of pairs.
#[instrument(skip(store))]
pub fn verify(store: &Store, fanout_cap: u64) -> Result<ConsistencyReport> {
    let snapshot = store.snapshot()?;
    let forward = snapshot.open_multimap_table(FORWARD).or_raise(|| ErrorKind::Table)?;
    let reverse = snapshot.open_multimap_table(REVERSE).or_raise(|| ErrorKind::Table)?;
    let mut report = ConsistencyReport::default();

    let mut flipped: Vec<([u8; DIGEST_LEN], [u8; DIGEST_LEN])> = Vec::new();
    for entry in forward.iter().or_raise(|| ErrorKind::Read)? {
        let (key, urls) = entry.or_raise(|| ErrorKind::Read)?;
        let key = *key.value();
        report.forward_keys += 1;
        let mut count = 0u64;
        for url in urls {
            let url = url.or_raise(|| ErrorKind::Read)?;
            flipped.push((*url.value(), key));
            count += 1;
        }
        report.forward_pairs += count;
        if count > fanout_cap {
            tracing::warn!(key = %Digest::from(key), count, fanout_cap, "Key holds more URLs than the fan-out cap");
            report.over_cap += 1;
        }
    }
    flipped.sort_unstable();

    let mut expected = flipped.into_iter().peekable();
    for entry in reverse.iter().or_raise(|| ErrorKind::Read)? {
        let (url, keys) = entry.or_raise(|| ErrorKind::Read)?;
        let url = *url.value();
        report.reverse_keys += 1;
        for key in keys {
            let pair = (url, *key.or_raise(|| ErrorKind::Read)?.value());
            report.reverse_pairs += 1;
            loop {
                match expected.peek().map(|next| next.cmp(&pair)) {
                    Some(Ordering::Less) => {
                        report_missing_reverse(expected.next(), &mut report);
                    },
                    Some(Ordering::Equal) => {
                        expected.next();
                        break;
                    },
                    Some(Ordering::Greater) | None => {
                        tracing::warn!(url = %Digest::from(pair.0), key = %Digest::from(pair.1), "Reverse pair has no matching forward pair");
                        report.missing_forward += 1;
                        break;
                    },
                }
            }
        }
    }
    for pair in expected {
        report_missing_reverse(Some(pair), &mut report);
    }

    tracing::info!(consistent = report.is_consistent(), ?report, "Verified store");
    Ok(report)
}

fn report_missing_reverse(pair: Option<([u8; DIGEST_LEN], [u8; DIGEST_LEN])>, report: &mut ConsistencyReport) {
    if let Some((url, key)) = pair {
        tracing::warn!(key = %Digest::from(key), url = %Digest::from(url), "Forward pair has no matching reverse pair");
        report.missing_reverse += 1;
    }
}
