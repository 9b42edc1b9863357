//! Layered configuration for surrogate.
//!
//! Sources, lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. A TOML file: the path given on the command line, otherwise
//!    `config.toml` in the platform config directory if it exists
//! 3. Environment variables prefixed `SURROGATE_`, with `__` separating
//!    sections (`SURROGATE_INGEST__COMMIT_INTERVAL=5000`)
//!
//! ```toml
//! [store]
//! path = "/var/lib/surrogate/index.redb"
//! cache_size = 268435456
//!
//! [index]
//! fanout_cap = 100000
//!
//! [ingest]
//! commit_interval = 10000
//! progress_interval = 100000
//! max_line_length = 500
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use surrogate_index::{IngestOptions, StoreOptions};

pub const ENV_PREFIX: &str = "SURROGATE_";
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub index: IndexConfig,
    pub ingest: IngestConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// The store file; created on first use.
    pub path: PathBuf,
    /// Page cache size in bytes. Unset keeps the store's own default.
    pub cache_size: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("surrogate.redb"),
            cache_size: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Maximum URLs a single key may name.
    pub fanout_cap: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            fanout_cap: surrogate_index::DEFAULT_FANOUT_CAP,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub commit_interval: u64,
    pub progress_interval: u64,
    /// Bytes, excluding the line terminator.
    pub max_line_length: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            commit_interval: surrogate_index::DEFAULT_COMMIT_INTERVAL,
            progress_interval: surrogate_index::DEFAULT_PROGRESS_INTERVAL,
            max_line_length: surrogate_index::DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl Config {
    /// Load and validate the configuration.
    ///
    /// An explicit `path` must exist; the platform default is skipped when it
    /// doesn't.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::Missing(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => default_path().filter(|path| path.is_file()),
        };
        match &file {
            Some(file) => tracing::debug!(path = %file.display(), "Loading config file"),
            None => tracing::debug!("No config file, using defaults and environment"),
        }
        Self::from_figment(figment(file.as_deref()))
    }

    /// Extract and validate a configuration from an already-assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("index.fanout_cap", self.index.fanout_cap),
            ("ingest.commit_interval", self.ingest.commit_interval),
            ("ingest.progress_interval", self.ingest.progress_interval),
        ];
        for (field, value) in counts {
            if value == 0 {
                exn::bail!(ErrorKind::Invalid(field));
            }
        }
        if self.ingest.max_line_length == 0 {
            exn::bail!(ErrorKind::Invalid("ingest.max_line_length"));
        }
        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            cache_size: self.store.cache_size,
        }
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            commit_interval: self.ingest.commit_interval,
            progress_interval: self.ingest.progress_interval,
            fanout_cap: self.index.fanout_cap,
        }
    }
}

/// Defaults, then `file` (if any), then the environment.
pub fn figment(file: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(file) = file {
        figment = figment.merge(Toml::file(file));
    }
    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// `config.toml` in the platform config directory, e.g.
/// `~/.config/surrogate/config.toml` on Linux.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "surrogate").map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}
