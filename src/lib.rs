//! graphlens - incremental LLM analysis of files in a dependency graph
//!
//! This library reads the file nodes of a dependency-graph export, fetches
//! each file from a hosted repository (over HTTP or from a shallow clone),
//! asks a chat model to summarize it and detect Docker usage, and caches the
//! results so interrupted runs resume where they stopped.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod llm;
pub mod pipeline;
pub mod source;
pub mod storage;

/// Re-export commonly used types
pub use analysis::AnalysisRecord;
pub use error::PipelineError;
pub use pipeline::{Pipeline, RunReport};
pub use storage::CacheStore;

/// Application-wide error type
pub use anyhow::Result;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "graphlens";
