//! CLI interface using clap
//!
//! Provides the command-line interface for graphlens

mod commands;

pub use commands::*;

use crate::input::DEFAULT_ELEMENTS_PATH;
use crate::source::clone::DEFAULT_CLONE_DIR;
use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// graphlens - LLM summaries and Docker detection for dependency-graph files
#[derive(Parser, Debug)]
#[command(name = "graphlens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the cache files
    #[arg(short, long, global = true, default_value = ".")]
    pub cache_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and analyze every file not yet in the cache
    Run(RunArgs),

    /// Show statistics for the cached analyses
    Stats(StatsArgs),
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// API key for the chat completion endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Repository to read files from (owner/name)
    #[arg(short, long, env = "GITHUB_REPO")]
    pub repo: String,

    /// Access token for the content API
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Branch to read files from
    #[arg(short, long, env = "GITHUB_BRANCH", default_value = "main")]
    pub branch: String,

    /// Clone the repository once instead of fetching each file
    #[arg(long, env = "USE_LOCAL_CLONE", value_parser = BoolishValueParser::new())]
    pub local_clone: bool,

    /// Dependency-graph export listing the files
    #[arg(short, long, default_value = DEFAULT_ELEMENTS_PATH)]
    pub elements: PathBuf,

    /// Scratch directory for the clone in local mode
    #[arg(long, default_value = DEFAULT_CLONE_DIR)]
    pub clone_dir: PathBuf,

    /// Config file (defaults to graphlens.toml in the cache directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Model name
    #[arg(short, long)]
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long)]
    pub llm_endpoint: Option<String>,

    /// Pause after each file in network mode, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,
}

/// Arguments for stats command
#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Output format (text, json)
    #[arg(short = 'o', long, default_value = "text")]
    pub format: OutputFormat,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_parsing() {
        let cli = Cli::try_parse_from([
            "graphlens",
            "run",
            "--repo",
            "acme/web",
            "--branch",
            "master",
            "--local-clone",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.repo, "acme/web");
        assert_eq!(args.branch, "master");
        assert!(args.local_clone);
        assert_eq!(args.elements, PathBuf::from("./cytoscape-elements.json"));
        assert_eq!(args.clone_dir, PathBuf::from("temp_repo_clone"));
    }

    #[test]
    fn test_stats_parsing() {
        let cli = Cli::try_parse_from(["graphlens", "stats", "-o", "json", "--cache-dir", "out"]).unwrap();
        assert_eq!(cli.cache_dir, PathBuf::from("out"));
        if let Commands::Stats(args) = cli.command {
            assert_eq!(args.format, OutputFormat::Json);
        } else {
            panic!("expected stats command");
        }
    }
}
