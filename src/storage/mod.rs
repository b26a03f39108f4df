//! JSON cache storage for graphlens
//!
//! Three tables are kept per cache directory:
//! - `combined-analysis.json`: the full record per file
//! - `summaries.json`: summary text per file
//! - `docker-analysis.json`: the Docker subset per file
//!
//! The combined table is authoritative: a key there means the file is done.
//! The other two are derived from the same record on every write.

mod tables;

pub use tables::{load_table, save_table, CacheTable};

use crate::analysis::{AnalysisRecord, DockerAnalysis};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// In-memory view of the cache tables with explicit flushes to disk
pub struct CacheStore {
    dir: PathBuf,
    combined: BTreeMap<String, AnalysisRecord>,
    summaries: BTreeMap<String, String>,
    docker: BTreeMap<String, DockerAnalysis>,
}

impl CacheStore {
    /// Open the cache in `dir`, loading whatever tables exist.
    ///
    /// Never fails: missing or corrupt tables start empty.
    pub fn open<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!("Failed to create cache directory {:?}: {}", dir, e);
        }

        let store = Self {
            combined: load_table(&CacheTable::Combined.path_in(&dir)),
            summaries: load_table(&CacheTable::Summaries.path_in(&dir)),
            docker: load_table(&CacheTable::DockerAnalysis.path_in(&dir)),
            dir,
        };

        tracing::debug!(
            "Loaded cache from {:?}: {} analyzed files",
            store.dir,
            store.combined.len()
        );

        store
    }

    /// Whether `file_path` has already been analyzed
    pub fn contains(&self, file_path: &str) -> bool {
        self.combined.contains_key(file_path)
    }

    /// Number of analyzed files
    pub fn len(&self) -> usize {
        self.combined.len()
    }

    /// Whether no file has been analyzed yet
    pub fn is_empty(&self) -> bool {
        self.combined.is_empty()
    }

    /// Full record for a file
    pub fn get(&self, file_path: &str) -> Option<&AnalysisRecord> {
        self.combined.get(file_path)
    }

    /// Summary for a file
    pub fn summary(&self, file_path: &str) -> Option<&str> {
        self.summaries.get(file_path).map(String::as_str)
    }

    /// Docker subset for a file
    pub fn docker_analysis(&self, file_path: &str) -> Option<&DockerAnalysis> {
        self.docker.get(file_path)
    }

    /// All full records, ordered by path
    pub fn records(&self) -> impl Iterator<Item = (&String, &AnalysisRecord)> {
        self.combined.iter()
    }

    /// Write `record` into all three tables
    pub fn record(&mut self, file_path: &str, record: AnalysisRecord) {
        self.summaries
            .insert(file_path.to_string(), record.summary.clone());
        self.docker
            .insert(file_path.to_string(), record.docker_view());
        self.combined.insert(file_path.to_string(), record);
    }

    /// Persist all three tables. Returns false if any write failed.
    pub fn flush(&self) -> bool {
        let mut ok = true;
        for table in CacheTable::ALL {
            let path = table.path_in(&self.dir);
            ok &= match table {
                CacheTable::Combined => save_table(&path, &self.combined),
                CacheTable::Summaries => save_table(&path, &self.summaries),
                CacheTable::DockerAnalysis => save_table(&path, &self.docker),
            };
        }
        tracing::debug!("Flushed {} records to {:?}", self.combined.len(), self.dir);
        ok
    }
}
