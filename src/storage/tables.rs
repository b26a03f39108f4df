//! On-disk JSON documents backing the cache tables

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The three persisted tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTable {
    /// Full records; presence means "already processed"
    Combined,
    /// Summary text only
    Summaries,
    /// Docker subset of each record
    DockerAnalysis,
}

impl CacheTable {
    /// Flush order
    pub const ALL: [CacheTable; 3] = [
        CacheTable::Combined,
        CacheTable::Summaries,
        CacheTable::DockerAnalysis,
    ];

    /// File name of the table inside the cache directory
    pub fn file_name(self) -> &'static str {
        match self {
            CacheTable::Combined => "combined-analysis.json",
            CacheTable::Summaries => "summaries.json",
            CacheTable::DockerAnalysis => "docker-analysis.json",
        }
    }

    /// Full path of the table inside `dir`
    pub fn path_in(self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

impl std::fmt::Display for CacheTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Read a table document. Missing or unreadable documents yield an empty map.
pub fn load_table<T: DeserializeOwned>(path: &Path) -> BTreeMap<String, T> {
    if !path.exists() {
        return BTreeMap::new();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Failed to read cache {:?}: {}", path, e);
            return BTreeMap::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!("Ignoring corrupt cache {:?}: {}", path, e);
            BTreeMap::new()
        }
    }
}

/// Overwrite a table document with `map`.
///
/// The document is written next to the target and renamed over it, so a
/// reader never sees a half-written file. Errors are logged, not returned.
pub fn save_table<T: Serialize>(path: &Path, map: &BTreeMap<String, T>) -> bool {
    match write_atomically(path, map) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Failed to save cache {:?}: {:#}", path, e);
            false
        }
    }
}

fn write_atomically<T: Serialize>(path: &Path, map: &BTreeMap<String, T>) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(map)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
