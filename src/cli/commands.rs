//! Command implementations

use super::{OutputFormat, RunArgs};
use crate::config::{FetchMode, FileConfig, RepoTarget};
use crate::error::PipelineError;
use crate::llm::{FileAnalyzer, LlmClient, LlmConfig};
use crate::pipeline::{
    spawn_signal_listener, CacheStats, Pipeline, PipelineOptions, RunReport, SourcePlan,
};
use crate::source::{GitHubSource, RepoCloner};
use crate::storage::CacheStore;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Analyze every pending file named in the graph export
pub async fn run(cache_dir: &Path, args: &RunArgs) -> Result<RunReport> {
    let api_key = args
        .openai_api_key
        .clone()
        .filter(|key| !key.is_empty())
        .ok_or(PipelineError::MissingCredential("OPENAI_API_KEY"))?;

    let mut config = match args.config {
        Some(ref path) => FileConfig::load(path)?,
        None => FileConfig::load_or_default(cache_dir)?,
    };
    if let Some(ref model) = args.model {
        config.llm.model = model.clone();
    }
    if let Some(ref endpoint) = args.llm_endpoint {
        config.llm.endpoint = endpoint.clone();
    }
    if let Some(delay_ms) = args.delay_ms {
        config.fetch.request_delay_ms = delay_ms;
    }

    let mode = if args.local_clone {
        FetchMode::LocalClone
    } else {
        FetchMode::Network
    };

    println!("Repository: {}", args.repo);
    println!("Branch: {}", args.branch);
    println!("Mode: {}", mode);
    if args.github_token.as_deref().is_some_and(|t| !t.is_empty()) {
        println!("Authenticating with access token");
    } else {
        println!("No access token, public repository access only");
    }

    let store = CacheStore::open(cache_dir);

    let client = LlmClient::new(LlmConfig {
        endpoint: config.llm.endpoint.clone(),
        model: config.llm.model.clone(),
        api_key: Some(api_key),
        max_tokens: config.llm.max_tokens,
        temperature: config.llm.temperature,
        timeout: Duration::from_secs(config.llm.timeout_secs),
    })?;
    let analyzer = FileAnalyzer::new(Arc::new(client))
        .with_max_content_chars(config.pipeline.max_content_chars)
        .with_response_language(config.llm.response_language.clone());

    let target = RepoTarget::new(args.repo.clone(), args.branch.clone())
        .with_token(args.github_token.clone());

    let plan = match mode {
        FetchMode::Network => SourcePlan::Network(GitHubSource::new(target, &config.fetch)?),
        FetchMode::LocalClone => SourcePlan::LocalClone(
            RepoCloner::new(
                target.repo,
                target.branch,
                &args.clone_dir,
                config.fetch.clone_base_url.clone(),
            )
            .with_token(target.token),
        ),
    };

    let options = PipelineOptions {
        flush_interval: config.pipeline.flush_interval,
        request_delay: config.fetch.request_delay(),
    };

    let cancel = CancellationToken::new();
    let listener = spawn_signal_listener(cancel.clone());

    let mut pipeline = Pipeline::new(store, analyzer, options, cancel);
    let outcome = pipeline.run(&args.elements, plan).await;
    listener.abort();

    let report = outcome?;
    print_report(&report);
    print_stats(&CacheStats::from_records(pipeline.store().records().map(|(_, r)| r)));

    Ok(report)
}

/// Show statistics for the cached analyses
pub fn stats(cache_dir: &Path, format: OutputFormat) -> Result<CacheStats> {
    let store = CacheStore::open(cache_dir);
    let stats = CacheStats::from_records(store.records().map(|(_, r)| r));

    match format {
        OutputFormat::Json => print_stats_json(&stats)?,
        OutputFormat::Text => print_stats(&stats),
    }

    Ok(stats)
}

/// Print the outcome of a run
pub fn print_report(report: &RunReport) {
    if report.pending == 0 {
        println!("\n✓ All {} files are already analyzed", report.candidates);
        return;
    }

    if report.interrupted {
        println!(
            "\n⚠ Interrupted after {} of {} pending files; progress saved",
            report.attempted, report.pending
        );
    } else {
        println!("\n✓ Analysis complete");
    }

    println!("  Analyzed this run: {}", report.analyzed);
    if report.degraded > 0 {
        println!("  Partially analyzed: {}", report.degraded);
    }
    if report.fetch_misses > 0 {
        println!("  Not found: {}", report.fetch_misses);
    }
    if report.analysis_failures > 0 {
        println!("  Model errors: {}", report.analysis_failures);
    }
}

/// Print statistics in text format
pub fn print_stats(stats: &CacheStats) {
    println!("\n{}", stats);
}

/// Print statistics in JSON format
pub fn print_stats_json(stats: &CacheStats) -> Result<()> {
    let json = serde_json::to_string_pretty(stats)?;
    println!("{}", json);
    Ok(())
}
