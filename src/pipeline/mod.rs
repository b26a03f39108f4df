//! Incremental fetch → analyze → cache pipeline
//!
//! A run moves through these stages:
//!
//! ```text
//! LoadingInput → Cloning (local mode) → Iterating → Flushing → Done
//!                                           └── interrupted ──┘
//! ```
//!
//! Files already present in the combined-analysis table are never
//! processed again, so a run can be stopped at any point and resumed.

mod interrupt;
mod stats;

pub use interrupt::spawn_signal_listener;
pub use stats::CacheStats;

use crate::config::FetchMode;
use crate::error::PipelineError;
use crate::input;
use crate::llm::FileAnalyzer;
use crate::source::{FileSource, GitHubSource, LocalSource, RepoCloner};
use crate::storage::CacheStore;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Stage of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadingInput,
    Cloning,
    Iterating,
    Flushing,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::LoadingInput => write!(f, "loading input"),
            Stage::Cloning => write!(f, "cloning"),
            Stage::Iterating => write!(f, "iterating"),
            Stage::Flushing => write!(f, "flushing"),
            Stage::Done => write!(f, "done"),
        }
    }
}

/// Where file content comes from for a run
pub enum SourcePlan {
    /// Fetch each file over HTTP
    Network(GitHubSource),
    /// Clone first, then read from the working copy
    LocalClone(RepoCloner),
}

/// Pacing options
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Flush after this many attempted files
    pub flush_interval: usize,
    /// Pause after each file in network mode
    pub request_delay: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            flush_interval: 5,
            request_delay: Duration::from_millis(500),
        }
    }
}

/// Counts from one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Files named in the input
    pub candidates: usize,
    /// Files not yet in the cache at start
    pub pending: usize,
    /// Files for which fetch was attempted
    pub attempted: usize,
    /// Files recorded this run
    pub analyzed: usize,
    /// Recorded files whose reply could not be parsed
    pub degraded: usize,
    /// Files whose content could not be fetched
    pub fetch_misses: usize,
    /// Files the model could not be asked about
    pub analysis_failures: usize,
    /// The run stopped early on a shutdown request
    pub interrupted: bool,
}

/// Drives a run over the pending files
pub struct Pipeline {
    store: CacheStore,
    analyzer: FileAnalyzer,
    options: PipelineOptions,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(
        store: CacheStore,
        analyzer: FileAnalyzer,
        options: PipelineOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            analyzer,
            options,
            cancel,
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Files from `candidates` that have no record yet, in input order
    pub fn pending(&self, candidates: &[String]) -> Vec<String> {
        candidates
            .iter()
            .filter(|path| !self.store.contains(path))
            .cloned()
            .collect()
    }

    /// Run the whole pipeline against the graph export at `elements`.
    ///
    /// In local mode the scratch clone is removed before this returns,
    /// whatever the outcome.
    pub async fn run(&mut self, elements: &Path, plan: SourcePlan) -> Result<RunReport, PipelineError> {
        enter(Stage::LoadingInput);
        let candidates = input::load_file_paths(elements).map_err(|source| PipelineError::Input {
            path: elements.to_path_buf(),
            source,
        })?;

        let pending = self.pending(&candidates);
        let mut report = RunReport {
            candidates: candidates.len(),
            pending: pending.len(),
            ..Default::default()
        };

        if pending.is_empty() {
            tracing::info!("All {} files are already analyzed", candidates.len());
            enter(Stage::Done);
            return Ok(report);
        }

        tracing::info!("{} of {} files pending", pending.len(), candidates.len());

        match plan {
            SourcePlan::Network(source) => {
                self.process(&pending, &source, &mut report).await;
            }
            SourcePlan::LocalClone(cloner) => {
                enter(Stage::Cloning);
                let repo = cloner.repo().to_string();
                let tried = cloner.branch_attempts();

                let cloner = tokio::task::spawn_blocking(move || {
                    let mut cloner = cloner;
                    cloner.clone_repository();
                    cloner
                })
                .await
                .map_err(|e| {
                    tracing::warn!("Clone task failed: {}", e);
                    PipelineError::CloneFailed {
                        repo: repo.clone(),
                        tried: tried.clone(),
                    }
                })?;

                if !cloner.is_cloned() {
                    return Err(PipelineError::CloneFailed { repo, tried });
                }

                tracing::info!(
                    "Reading files from {:?} (branch {})",
                    cloner.clone_dir(),
                    cloner.branch()
                );
                let source = LocalSource::from_cloner(&cloner);
                self.process(&pending, &source, &mut report).await;
                // Dropping the cloner removes the scratch directory
            }
        }

        enter(Stage::Done);
        Ok(report)
    }

    /// Process `pending` files in order, then flush.
    ///
    /// Per-file failures are counted in `report` and never stop the loop.
    pub async fn process(
        &mut self,
        pending: &[String],
        source: &dyn FileSource,
        report: &mut RunReport,
    ) {
        enter(Stage::Iterating);

        let flush_interval = self.options.flush_interval.max(1);
        let delay = match source.mode() {
            FetchMode::Network => self.options.request_delay,
            FetchMode::LocalClone => Duration::ZERO,
        };

        let progress = ProgressBar::new(pending.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {wide_msg}") {
            progress.set_style(style);
        }

        for (index, file_path) in pending.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!("Interrupted, saving progress");
                report.interrupted = true;
                break;
            }

            progress.set_message(file_path.clone());
            self.process_file(file_path, source, report).await;
            report.attempted += 1;
            progress.inc(1);

            if (index + 1) % flush_interval == 0 {
                self.store.flush();
            }

            if !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }
        }

        progress.finish_and_clear();

        enter(Stage::Flushing);
        self.store.flush();
    }

    async fn process_file(&mut self, file_path: &str, source: &dyn FileSource, report: &mut RunReport) {
        let Some(content) = source.fetch(file_path).await else {
            report.fetch_misses += 1;
            return;
        };

        let Some(analysis) = self.analyzer.analyze(file_path, &content).await else {
            report.analysis_failures += 1;
            return;
        };

        if analysis.degraded {
            report.degraded += 1;
        }
        report.analyzed += 1;
        self.store.record(file_path, analysis.record);
    }
}

fn enter(stage: Stage) {
    tracing::debug!("Pipeline stage: {}", stage);
}
