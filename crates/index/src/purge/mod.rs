//! Cascading purge.
//!
//! Purging a key removes, for every URL that key names, *every* key naming
//! that URL (the target included) from both indexes. Keys that co-occur on a
//! URL are invalidated together.
//!
//! Work is split into one write transaction per URL:
//!
//! 1. **Select URL**: in a fresh transaction, take the target's lowest
//!    remaining URL. None left: done.
//! 2. **Select siblings**: read every key the reverse table lists for it.
//! 3. **Delete pairs**: remove each `(sibling, url)` from the forward table.
//!    A missing pair is logged and counted, and the purge carries on.
//! 4. Drop the URL from the reverse table, commit, go to 1.
//!
//! A failure part-way through leaves every already-committed URL fully purged
//! and the rest untouched; a concurrent reader can observe that intermediate
//! state between commits.

pub mod error;

use crate::digest::Digest;
use crate::purge::error::{ErrorKind, Result};
use crate::store::{IndexTables, Store};
use exn::ResultExt;
use tracing::instrument;

/// What happened to one URL of the target key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlPurge {
    pub url: Digest,
    /// Keys the reverse table listed for this URL (the target included).
    pub siblings: u64,
    /// Forward pairs removed for this URL.
    pub deleted: u64,
    /// Pairs present in one table but not the other.
    pub inconsistencies: u64,
}

/// Summary of a completed purge.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// URLs ("images") the target named when the purge started.
    pub images: u64,
    /// One entry per URL, in the order they were purged.
    pub urls: Vec<UrlPurge>,
    /// Total forward pairs removed.
    pub deleted: u64,
    /// Total pairs found in one table but not the other.
    pub inconsistencies: u64,
}

/// Purge `target` and every key sharing a URL with it.
///
/// Fails with [`ErrorKind::KeyNotFound`] if `target` names no URLs.
#[instrument(skip(store), fields(%target))]
pub fn purge(store: &Store, target: &Digest) -> Result<PurgeReport> {
    let mut report = PurgeReport::default();
    let mut first = true;
    loop {
        let session = store.session().or_raise(|| ErrorKind::Store)?;
        let step = {
            let mut tables = session.tables().or_raise(|| ErrorKind::Store)?;
            if first {
                report.images = tables.url_count(target).or_raise(|| ErrorKind::Store)?;
                if report.images == 0 {
                    exn::bail!(ErrorKind::KeyNotFound(*target));
                }
                first = false;
            }
            match tables.first_url(target).or_raise(|| ErrorKind::Store)? {
                Some(url) => Some(purge_url(&mut tables, target, url)?),
                None => None,
            }
        };
        let Some(step) = step else {
            session.abort().or_raise(|| ErrorKind::Store)?;
            break;
        };
        session.commit().or_raise(|| ErrorKind::Store)?;
        tracing::debug!(url = %step.url, siblings = step.siblings, deleted = step.deleted, "Purged URL");
        report.deleted += step.deleted;
        report.inconsistencies += step.inconsistencies;
        report.urls.push(step);
    }
    tracing::info!(
        images = report.images,
        deleted = report.deleted,
        inconsistencies = report.inconsistencies,
        "Purge complete"
    );
    Ok(report)
}

/// Remove every association of `url`, inside the caller's transaction.
fn purge_url(tables: &mut IndexTables<'_>, target: &Digest, url: Digest) -> Result<UrlPurge> {
    let siblings = tables.keys(&url).or_raise(|| ErrorKind::Store)?;
    let mut step = UrlPurge {
        url,
        siblings: u64::try_from(siblings.len()).unwrap_or(u64::MAX),
        deleted: 0,
        inconsistencies: 0,
    };
    for sibling in &siblings {
        if tables.remove_forward(sibling, &url).or_raise(|| ErrorKind::Store)? {
            step.deleted += 1;
        } else {
            tracing::warn!(%sibling, %url, "Reverse pair has no matching forward pair");
            step.inconsistencies += 1;
        }
    }
    tables.remove_reverse(&url).or_raise(|| ErrorKind::Store)?;
    // The target must lose this URL even if the reverse table never listed
    // it, otherwise the next step would select the same URL again.
    if tables.remove_forward(target, &url).or_raise(|| ErrorKind::Store)? {
        tracing::warn!(%target, %url, "Forward pair has no matching reverse pair");
        step.deleted += 1;
        step.inconsistencies += 1;
    }
    Ok(step)
}
