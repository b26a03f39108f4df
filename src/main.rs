//! graphlens - dependency-graph file analysis tool
//!
//! Summarizes the files of a dependency graph with an LLM, flags Docker
//! usage, and caches results so runs can be resumed.

use anyhow::Result;
use graphlens::cli::{run, stats, Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Setup logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Execute command
    match cli.command {
        Commands::Run(args) => {
            run(&cli.cache_dir, &args).await?;
        }

        Commands::Stats(args) => {
            stats(&cli.cache_dir, args.format)?;
        }
    }

    Ok(())
}
