//! Ingestion: records in, associations out, committed in batches.

pub mod error;
mod record;

use crate::digest::Hasher;
use crate::ingest::error::{ErrorKind, Result};
use crate::maintain::Outcome;
use crate::store::{IndexTables, Store};
use crate::{DEFAULT_COMMIT_INTERVAL, DEFAULT_FANOUT_CAP, DEFAULT_PROGRESS_INTERVAL};
use exn::ResultExt;
use std::time::{Duration, Instant};
use tracing::instrument;

pub use crate::ingest::record::{Record, RecordReader};

/// Knobs for one ingestion run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IngestOptions {
    /// Accepted records per write transaction.
    pub commit_interval: u64,
    /// Accepted records between [`IngestEvent::Progress`] events.
    pub progress_interval: u64,
    /// Maximum URLs per key; see [`Outcome::CapExceeded`].
    pub fanout_cap: u64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            commit_interval: DEFAULT_COMMIT_INTERVAL,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            fanout_cap: DEFAULT_FANOUT_CAP,
        }
    }
}

/// Running totals for an ingestion run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Records accepted and applied.
    pub records: u64,
    /// Associations newly written to both tables.
    pub keys_added: u64,
    /// Associations that were already stored.
    pub duplicates: u64,
    /// Associations dropped because the key was at the fan-out cap.
    pub capped: u64,
    /// Input lines rejected as malformed or over-length.
    pub rejected: u64,
    /// Write transactions committed.
    pub commits: u64,
}

/// Progress events emitted by [`ingest`] while it works through the input.
pub enum IngestEvent<'a> {
    /// Another `progress_interval` records were applied; `elapsed` is the
    /// time since the previous progress event (or the start of the run).
    Progress { records: u64, elapsed: Duration },
    /// A batch was committed; `records` is the running total.
    Committed { records: u64 },
    /// An input line was skipped. Ingestion continues.
    Rejected(&'a error::Error),
}

/// Apply every record in `records` to `store`.
///
/// Records are applied through a fresh [`Session`](crate::store::Session)
/// every `commit_interval` accepted records. Malformed lines are reported via
/// `observe` and counted; they never stop the run. An input I/O error or any
/// store failure is fatal: the open transaction is dropped uncommitted and the
/// error is returned, while earlier batches stay committed.
#[instrument(skip_all, fields(commit_interval = options.commit_interval, fanout_cap = options.fanout_cap))]
pub fn ingest<I>(
    store: &Store,
    hasher: &Hasher,
    records: I,
    options: &IngestOptions,
    mut observe: impl FnMut(IngestEvent<'_>),
) -> Result<IngestStats>
where
    I: IntoIterator<Item = Result<Record>>,
{
    let mut records = records.into_iter();
    let mut stats = IngestStats::default();
    let commit_interval = options.commit_interval.max(1);
    let mut timer = Instant::now();
    loop {
        let session = store.session().or_raise(|| ErrorKind::Store)?;
        let mut batch = 0u64;
        let mut exhausted = false;
        {
            let mut tables = session.tables().or_raise(|| ErrorKind::Store)?;
            while batch < commit_interval {
                let record = match records.next() {
                    Some(Ok(record)) => record,
                    Some(Err(e)) if e.is_fatal() => return Err(e),
                    Some(Err(e)) => {
                        let reason: &ErrorKind = &e;
                        tracing::warn!(%reason, "Skipping input line");
                        stats.rejected += 1;
                        observe(IngestEvent::Rejected(&e));
                        continue;
                    },
                    None => {
                        exhausted = true;
                        break;
                    },
                };
                apply(&mut tables, hasher, &record, options.fanout_cap, &mut stats)?;
                batch += 1;
                stats.records += 1;
                if stats.records.is_multiple_of(options.progress_interval) {
                    observe(IngestEvent::Progress {
                        records: stats.records,
                        elapsed: timer.elapsed(),
                    });
                    timer = Instant::now();
                }
            }
        }
        session.commit().or_raise(|| ErrorKind::Store)?;
        stats.commits += 1;
        tracing::debug!(batch, records = stats.records, "Committed ingestion batch");
        observe(IngestEvent::Committed { records: stats.records });
        if exhausted {
            break;
        }
    }
    tracing::info!(
        records = stats.records,
        keys_added = stats.keys_added,
        duplicates = stats.duplicates,
        capped = stats.capped,
        rejected = stats.rejected,
        "Ingestion complete"
    );
    Ok(stats)
}

/// Hash one record and hand each of its associations to the maintainer.
fn apply(
    tables: &mut IndexTables<'_>,
    hasher: &Hasher,
    record: &Record,
    fanout_cap: u64,
    stats: &mut IngestStats,
) -> Result<()> {
    let url = hasher.hash(&record.url);
    for key in &record.keys {
        let key = hasher.hash(key);
        match tables.add_association(&key, &url, fanout_cap).or_raise(|| ErrorKind::Store)? {
            Outcome::Added => stats.keys_added += 1,
            Outcome::Duplicate => stats.duplicates += 1,
            Outcome::CapExceeded => stats.capped += 1,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(lines: &[(&str, &[&str])]) -> Vec<Result<Record>> {
        lines.iter().map(|(url, keys)| Ok(Record::new(*url, keys.iter().copied()))).collect()
    }

    #[test]
    fn test_commits_every_interval() {
        let store = Store::open_in_memory().unwrap();
        let input = records(&[("u1", &["k"]), ("u2", &["k"]), ("u3", &["k"]), ("u4", &["k"]), ("u5", &["k"])]);
        let options = IngestOptions {
            commit_interval: 2,
            ..IngestOptions::default()
        };
        let mut committed = Vec::new();
        let stats = ingest(&store, &Hasher::new(), input, &options, |event| {
            if let IngestEvent::Committed { records } = event {
                committed.push(records);
            }
        })
        .unwrap();
        assert_eq!(committed, vec![2, 4, 5]);
        assert_eq!(stats.commits, 3);
        assert_eq!(stats.records, 5);
        assert_eq!(stats.keys_added, 5);
    }

    #[test]
    fn test_progress_every_interval() {
        let store = Store::open_in_memory().unwrap();
        let input = records(&[("u1", &["k"]), ("u2", &["k"]), ("u3", &["k"]), ("u4", &["k"])]);
        let options = IngestOptions {
            progress_interval: 2,
            ..IngestOptions::default()
        };
        let mut progress = Vec::new();
        ingest(&store, &Hasher::new(), input, &options, |event| {
            if let IngestEvent::Progress { records, .. } = event {
                progress.push(records);
            }
        })
        .unwrap();
        assert_eq!(progress, vec![2, 4]);
    }

    #[test]
    fn test_rejected_lines_are_counted_not_fatal() {
        let store = Store::open_in_memory().unwrap();
        let mut input = records(&[("u1", &["k1"])]);
        input.push(Err(error::Error::from(ErrorKind::MissingKeys { line: 2 })));
        input.extend(records(&[("u3", &["k3"])]));
        let mut rejected = 0;
        let stats = ingest(&store, &Hasher::new(), input, &IngestOptions::default(), |event| {
            if let IngestEvent::Rejected(e) = event {
                assert_eq!(**e, ErrorKind::MissingKeys { line: 2 });
                rejected += 1;
            }
        })
        .unwrap();
        assert_eq!(rejected, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.records, 2);
        assert_eq!(stats.keys_added, 2);
    }

    #[test]
    fn test_fatal_input_error_discards_open_batch() {
        let store = Store::open_in_memory().unwrap();
        let hasher = Hasher::new();
        let mut input = records(&[("u1", &["k1"]), ("u2", &["k2"]), ("u3", &["k3"])]);
        input.push(Err(error::Error::from(ErrorKind::Input)));
        let options = IngestOptions {
            commit_interval: 2,
            ..IngestOptions::default()
        };
        let err = ingest(&store, &hasher, input, &options, |_| {}).unwrap_err();
        assert_eq!(*err, ErrorKind::Input);

        // The first batch was committed, the second (u3) was not.
        let session = store.session().unwrap();
        let tables = session.tables().unwrap();
        assert_eq!(tables.url_count(&hasher.hash("k1")).unwrap(), 1);
        assert_eq!(tables.url_count(&hasher.hash("k2")).unwrap(), 1);
        assert_eq!(tables.url_count(&hasher.hash("k3")).unwrap(), 0);
    }

    #[test]
    fn test_empty_input() {
        let store = Store::open_in_memory().unwrap();
        let stats = ingest(&store, &Hasher::new(), Vec::<Result<Record>>::new(), &IngestOptions::default(), |_| {}).unwrap();
        assert_eq!(stats, IngestStats { commits: 1, ..IngestStats::default() });
    }
}
