//! File content sources
//!
//! A file recorded in the graph may live at its recorded path or under a
//! framework source prefix, and the default branch may be `main` or
//! `master`. Sources therefore walk fixed, ordered lists of alternatives
//! instead of failing on the first miss:
//! - [`PATH_VARIANTS`] for the file location
//! - [`branch_candidates`] for the branch (network mode)
//! - [`remote::Endpoint::ORDER`] for the remote endpoint (network mode)

pub mod clone;
pub mod local;
pub mod remote;

pub use clone::RepoCloner;
pub use local::LocalSource;
pub use remote::{Endpoint, GitHubSource};

use crate::config::FetchMode;
use async_trait::async_trait;

/// Prefixes tried, in order, in front of a recorded file path
pub const PATH_VARIANTS: [&str; 3] = ["", "src/", "./"];

/// Something that can resolve a recorded file path to its content
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Content of `file_path`, or `None` if no variant could be read
    async fn fetch(&self, file_path: &str) -> Option<String>;

    /// Which mode this source implements
    fn mode(&self) -> FetchMode;
}

/// All physical paths to try for a recorded path, in order
pub fn path_variants(file_path: &str) -> Vec<String> {
    PATH_VARIANTS
        .iter()
        .map(|prefix| format!("{}{}", prefix, file_path))
        .collect()
}

/// The usual counterpart of a default branch name
pub fn sibling_branch(branch: &str) -> Option<&'static str> {
    match branch {
        "main" => Some("master"),
        "master" => Some("main"),
        _ => None,
    }
}

/// Branches to try when reading over the network: the configured one, then
/// its sibling
pub fn branch_candidates(branch: &str) -> Vec<String> {
    let mut branches = vec![branch.to_string()];
    if let Some(sibling) = sibling_branch(branch) {
        branches.push(sibling.to_string());
    }
    branches
}
