//! Fixed-width digests and the domain-keyed content hasher.
//!
//! Every key and URL is reduced to a [`Digest`] before it touches the store.
//! The width is fixed at [`DIGEST_LEN`] bytes for the lifetime of a store
//! file; digests are stored raw, never hex-encoded.

pub mod error;

use crate::digest::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Width, in bytes, of every digest written to the store.
pub const DIGEST_LEN: usize = 8;

/// Domain separation context for the BLAKE3 key derivation. Changing this
/// string changes every digest, so an existing store would no longer match
/// freshly hashed input.
const DOMAIN_CONTEXT: &str = "surrogate-index 2026-10-19 key and url digests";

/// A fixed-width surrogate identifier for a key or URL.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex rendering, as accepted by [`FromStr`].
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Digest {
    type Error = error::Error;
    fn try_from(value: &[u8]) -> Result<Self> {
        let bytes = <[u8; DIGEST_LEN]>::try_from(value).or_raise(|| ErrorKind::InvalidLength {
            expected: DIGEST_LEN,
            actual: value.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl FromStr for Digest {
    type Err = error::Error;
    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; DIGEST_LEN];
        // `decode_to_slice` rejects any length other than exactly twice the
        // output buffer, so short and long inputs both fail here.
        hex::decode_to_slice(s.trim(), &mut bytes).or_raise(|| ErrorKind::InvalidHex(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.to_hex())
    }
}

impl Debug for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "Digest({})", self.to_hex())
    }
}

/// Deterministic, domain-keyed hasher producing [`Digest`]s.
///
/// Uses BLAKE3 in key-derivation mode with a fixed context string, reading
/// exactly [`DIGEST_LEN`] bytes from the extendable output. Cloning is cheap;
/// the prepared state is reused for every call to [`hash`](Self::hash).
#[derive(Clone, Debug)]
pub struct Hasher {
    prepared: blake3::Hasher,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::with_context(DOMAIN_CONTEXT)
    }
}

impl Hasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A hasher for a different domain. Digests from different contexts are
    /// unrelated, so a store must only ever be fed from one context.
    #[must_use]
    pub fn with_context(context: &str) -> Self {
        Self {
            prepared: blake3::Hasher::new_derive_key(context),
        }
    }

    #[must_use]
    pub fn hash(&self, content: impl AsRef<[u8]>) -> Digest {
        let mut hasher = self.prepared.clone();
        hasher.update(content.as_ref());
        let mut bytes = [0u8; DIGEST_LEN];
        hasher.finalize_xof().fill(&mut bytes);
        Digest(bytes)
    }
}

/// A key supplied from outside the process, tagged with whether it still
/// needs hashing.
///
/// The decision is made once, where the key enters the program; everything
/// downstream only ever sees the resolved [`Digest`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyInput {
    /// The original key text, hashed with the store's [`Hasher`].
    Raw(String),
    /// An already hashed key, parsed from its hex form.
    Digest(Digest),
}

impl KeyInput {
    /// Build from user input, parsing `value` as hex when `hashed` is set.
    pub fn new(value: impl Into<String>, hashed: bool) -> Result<Self> {
        let value = value.into();
        match hashed {
            true => Ok(Self::Digest(value.parse()?)),
            false => Ok(Self::Raw(value)),
        }
    }

    #[must_use]
    pub fn resolve(&self, hasher: &Hasher) -> Digest {
        match self {
            Self::Raw(raw) => hasher.hash(raw.as_bytes()),
            Self::Digest(digest) => *digest,
        }
    }
}
