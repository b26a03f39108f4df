//! Errors that end a run
//!
//! Per-file failures never surface here: they are logged and the pipeline
//! moves on to the next file.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required credential was not configured
    #[error("{0} is not set; export it or pass it on the command line")]
    MissingCredential(&'static str),

    /// The dependency-graph export could not be read or parsed
    #[error("failed to load graph elements from {path:?}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: crate::input::InputError,
    },

    /// Every candidate branch failed to clone
    #[error("failed to clone {repo} (tried branches: {})", tried.join(", "))]
    CloneFailed { repo: String, tried: Vec<String> },
}
