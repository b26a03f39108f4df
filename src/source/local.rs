//! Content source reading from a local working copy

use super::{path_variants, FileSource, RepoCloner};
use crate::config::FetchMode;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Reads files from a cloned working copy
pub struct LocalSource {
    root: PathBuf,
    /// False when the clone never succeeded; every fetch is refused
    ready: bool,
}

impl LocalSource {
    /// Read from an existing working copy at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ready: true,
        }
    }

    /// Read from the cloner's scratch directory, if it was cloned
    pub fn from_cloner(cloner: &RepoCloner) -> Self {
        Self {
            root: cloner.clone_dir().to_path_buf(),
            ready: cloner.is_cloned(),
        }
    }
}

#[async_trait]
impl FileSource for LocalSource {
    async fn fetch(&self, file_path: &str) -> Option<String> {
        if !self.ready {
            tracing::warn!("Repository was not cloned, cannot read {}", file_path);
            return None;
        }

        let variants = path_variants(file_path);
        for variant in &variants {
            let candidate = self.root.join(variant);
            if !candidate.is_file() {
                continue;
            }

            match tokio::fs::read_to_string(&candidate).await {
                Ok(content) => {
                    tracing::info!("Read {} locally as {}", file_path, variant);
                    return Some(content);
                }
                Err(e) => {
                    tracing::warn!("Failed to read {:?}: {}", candidate, e);
                }
            }
        }

        tracing::warn!(
            "{} not found in working copy, tried: {}",
            file_path,
            variants.join(", ")
        );
        None
    }

    fn mode(&self) -> FetchMode {
        FetchMode::LocalClone
    }
}
