//! Store runtime configuration, loaded from an optional `galley.toml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GalleyConfig {
    #[serde(default)]
    pub store: StoreConfig,
}

/// Runtime knobs for the SQLite store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Busy timeout in milliseconds before a lock attempt gives up.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub journal_mode: JournalMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: JournalMode::default(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// SQLite journal mode applied when opening an on-disk store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    /// Concurrent readers while writers append.
    #[default]
    Wal,
    Delete,
    Truncate,
}

impl JournalMode {
    #[must_use]
    pub const fn as_pragma(self) -> &'static str {
        match self {
            Self::Wal => "WAL",
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
        }
    }
}

/// Load `galley.toml` from `root`, falling back to defaults when the file
/// does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(root: &Path) -> Result<GalleyConfig> {
    let path = root.join("galley.toml");
    if !path.exists() {
        return Ok(GalleyConfig::default());
    }
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parse config file {}", path.display()))
}
