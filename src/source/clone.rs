//! Shallow clone of the target repository for local mode

use super::sibling_branch;
use git2::build::RepoBuilder;
use git2::{Cred, FetchOptions, RemoteCallbacks};
use std::path::{Path, PathBuf};

/// Default scratch directory for the clone
pub const DEFAULT_CLONE_DIR: &str = "temp_repo_clone";

/// Branches tried, in order, after the configured one fails
pub const ALTERNATE_BRANCHES: [&str; 3] = ["master", "develop", "dev"];

/// Clones a repository into a scratch directory and removes it when dropped
pub struct RepoCloner {
    repo: String,
    branch: String,
    clone_dir: PathBuf,
    base_url: String,
    token: Option<String>,
    attempted: bool,
    cloned: bool,
}

impl RepoCloner {
    /// Prepare a clone of `repo` (`owner/name`) at `branch` into `clone_dir`
    pub fn new(
        repo: impl Into<String>,
        branch: impl Into<String>,
        clone_dir: impl AsRef<Path>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            repo: repo.into(),
            branch: branch.into(),
            clone_dir: clone_dir.as_ref().to_path_buf(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            attempted: false,
            cloned: false,
        }
    }

    /// Authenticate the clone with an access token; an empty token is ignored
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Remote URL to clone from
    pub fn url(&self) -> String {
        format!("{}/{}.git", self.base_url, self.repo)
    }

    pub fn clone_dir(&self) -> &Path {
        &self.clone_dir
    }

    /// Branch that was cloned, or the configured branch before cloning
    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Whether a clone has succeeded
    pub fn is_cloned(&self) -> bool {
        self.cloned
    }

    /// Every branch that will be tried, in order
    pub fn branch_attempts(&self) -> Vec<String> {
        let mut branches = vec![self.branch.clone()];
        let alternates = sibling_branch(&self.branch)
            .into_iter()
            .chain(ALTERNATE_BRANCHES);
        for alt in alternates {
            if !branches.iter().any(|b| b == alt) {
                branches.push(alt.to_string());
            }
        }
        branches
    }

    /// Clone the repository, falling back through alternate branch names.
    ///
    /// Blocking; returns whether any branch could be cloned.
    pub fn clone_repository(&mut self) -> bool {
        self.attempted = true;

        if self.clone_dir.exists() {
            tracing::info!("Removing existing clone directory {:?}", self.clone_dir);
            if let Err(e) = std::fs::remove_dir_all(&self.clone_dir) {
                tracing::warn!("Failed to remove {:?}: {}", self.clone_dir, e);
                return false;
            }
        }

        let url = self.url();
        for branch in self.branch_attempts() {
            tracing::info!("Cloning {} (branch {})", url, branch);

            match self.clone_branch(&url, &branch) {
                Ok(()) => {
                    tracing::info!("Cloned {} into {:?}", branch, self.clone_dir);
                    self.branch = branch;
                    self.cloned = true;
                    return true;
                }
                Err(e) => {
                    tracing::warn!("Clone of branch {} failed: {}", branch, e.message());
                    // A failed clone can leave a partial directory behind
                    let _ = std::fs::remove_dir_all(&self.clone_dir);
                }
            }
        }

        false
    }

    fn clone_branch(&self, url: &str, branch: &str) -> Result<(), git2::Error> {
        let mut credentials = CloneCredentials::new(self.token.as_deref());
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username, _allowed| credentials.next(url, username));

        let mut fetch = FetchOptions::new();
        fetch.depth(1);
        fetch.remote_callbacks(callbacks);

        RepoBuilder::new()
            .branch(branch)
            .fetch_options(fetch)
            .clone(url, &self.clone_dir)?;

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn assume_cloned(&mut self) {
        self.attempted = true;
        self.cloned = true;
    }

    /// Remove the scratch directory
    pub fn cleanup(&self) {
        if !self.attempted || !self.clone_dir.exists() {
            return;
        }

        tracing::info!("Removing clone directory {:?}", self.clone_dir);
        if let Err(e) = std::fs::remove_dir_all(&self.clone_dir) {
            tracing::warn!("Failed to remove clone directory {:?}: {}", self.clone_dir, e);
        }
    }
}

/// Answers libgit2's credential requests for one clone attempt.
///
/// libgit2 asks again after a rejected credential, so only the first request
/// is answered; later ones fail the attempt instead of looping.
struct CloneCredentials<'a> {
    token: Option<&'a str>,
    asked: bool,
}

impl<'a> CloneCredentials<'a> {
    fn new(token: Option<&'a str>) -> Self {
        Self {
            token,
            asked: false,
        }
    }

    fn next(&mut self, url: &str, username: Option<&str>) -> Result<Cred, git2::Error> {
        if self.asked {
            return Err(git2::Error::from_str("credentials were rejected"));
        }
        self.asked = true;

        match self.token {
            Some(token) => Cred::userpass_plaintext("x-access-token", token),
            None => {
                let config = git2::Config::open_default()?;
                Cred::credential_helper(&config, url, username)
            }
        }
    }
}

impl Drop for RepoCloner {
    fn drop(&mut self) {
        self.cleanup();
    }
}
