use crate::error::{Error, ErrorKind};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Parser)]
#[command(name = "surrogate", version, about = "Surrogate-key index: ingest, inspect and cascade-purge")]
pub struct Cli {
    /// Config file (TOML). Defaults to the platform config directory.
    #[arg(long, global = true, env = "SURROGATE_CONFIG")]
    pub config: Option<PathBuf>,
    /// Store file, overriding `store.path` from the config.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
    /// Log at debug level (RUST_LOG still wins when set).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,
    /// Only log errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load `<url> <key> [<key> ...]` records, one per line.
    Ingest(IngestArgs),
    /// Remove a key and every key sharing a URL with it.
    Purge(PurgeArgs),
    /// Print `<digest>\t<count>` for every key in one index.
    Inspect(InspectArgs),
    /// Check that the forward and reverse indexes mirror each other.
    Verify,
    /// Print the digest of each value, for use with `purge --hashed`.
    Hash(HashArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Read records from this file instead of stdin.
    #[arg(long, short)]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PurgeArgs {
    /// Key to purge. Prompted for when omitted.
    pub key: Option<String>,
    /// The key is already a hex digest.
    #[arg(long, conflicts_with = "raw")]
    pub hashed: bool,
    /// The key is original text and needs hashing.
    #[arg(long)]
    pub raw: bool,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Walk the reverse index (url → keys) instead.
    #[arg(long)]
    pub reverse: bool,
    /// Only list entries at the fan-out cap.
    #[arg(long)]
    pub at_cap: bool,
}

#[derive(Debug, Args)]
pub struct HashArgs {
    #[arg(required = true)]
    pub values: Vec<String>,
}

/// Whether a purge key still needs hashing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyForm {
    Hashed,
    Raw,
}

impl KeyForm {
    /// The form chosen by `--hashed`/`--raw`, if either was given.
    pub fn from_flags(hashed: bool, raw: bool) -> Option<Self> {
        match (hashed, raw) {
            (true, _) => Some(Self::Hashed),
            (false, true) => Some(Self::Raw),
            (false, false) => None,
        }
    }

    pub fn is_hashed(self) -> bool {
        self == Self::Hashed
    }
}

/// Parses an answer to "Is this key hashed (yes/no)?".
impl FromStr for KeyForm {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Ok(Self::Hashed),
            "no" | "n" => Ok(Self::Raw),
            _ => Err(Error::from(ErrorKind::InvalidAnswer(s.trim().to_string()))),
        }
    }
}
