//! Adding one association to both indexes.
//!
//! The forward and reverse tables are only ever written together, inside the
//! same transaction, so a committed store always satisfies
//! `(k, u) ∈ forward ⇔ (u, k) ∈ reverse`.

use crate::digest::Digest;
use crate::store::IndexTables;
use crate::store::error::{ErrorKind, Result};
use exn::ResultExt;

/// What happened to a single `(key, url)` association.
///
/// Neither [`Duplicate`](Self::Duplicate) nor [`CapExceeded`](Self::CapExceeded)
/// is an error; both are steady-state outcomes that the caller counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The pair was new and is now in both tables.
    Added,
    /// The pair was already stored; nothing was written.
    Duplicate,
    /// The key already names `fanout_cap` URLs; the pair was dropped without
    /// any write.
    CapExceeded,
}

impl IndexTables<'_> {
    /// Record that `key` names `url`, honouring the fan-out cap.
    ///
    /// The cap check and the insert are two separate table operations. That
    /// is only sound because the store admits a single write transaction at a
    /// time; a store with concurrent writers would need a per-key lock here.
    pub fn add_association(&mut self, key: &Digest, url: &Digest, fanout_cap: u64) -> Result<Outcome> {
        if self.url_count(key)? >= fanout_cap {
            tracing::trace!(%key, %url, fanout_cap, "Fan-out cap reached; dropping association");
            return Ok(Outcome::CapExceeded);
        }
        let existed = self.forward.insert(key.as_bytes(), url.as_bytes()).or_raise(|| ErrorKind::Write)?;
        if existed {
            return Ok(Outcome::Duplicate);
        }
        let healed = self.reverse.insert(url.as_bytes(), key.as_bytes()).or_raise(|| ErrorKind::Write)?;
        if healed {
            // Only reachable if an earlier run left a reverse pair without its
            // forward pair.
            tracing::warn!(%key, %url, "Reverse pair already present for a new forward pair");
        }
        Ok(Outcome::Added)
    }
}
