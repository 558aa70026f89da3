//! Ingest CLI - run and query the code ingestion pipeline
//!
//! # Usage
//!
//! ```bash
//! # Ingest a repository (full run on first ingest, incremental after)
//! ingest run acme/widgets https://github.com/acme/widgets
//!
//! # Poll a job's progress
//! ingest status <job-id>
//!
//! # Search an ingested repository
//! ingest search acme/widgets "retry logic for failed HTTP calls"
//!
//! # Remove a repository's store and clone
//! ingest delete acme/widgets
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod progress;

/// Ingest - clone, parse, summarize, embed, and search a repository's code
#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Options available to every subcommand.
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Path to a TOML configuration file (defaults to `.ingest/config.toml`)
    #[arg(long, short = 'c', global = true, env = "INGEST_CONFIG")]
    config: Option<PathBuf>,

    /// Workspace root containing per-repository stores and clones
    #[arg(long, short = 'w', global = true, env = "INGEST_WORKSPACE", default_value = ".")]
    workspace: PathBuf,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable verbose (debug-level) logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a repository: clone, parse, summarize, and embed it
    Run(commands::run::RunArgs),

    /// Poll an ingestion job's status
    Status(commands::status::StatusArgs),

    /// Search an already-ingested repository
    Search(commands::search::SearchArgs),

    /// Remove a repository's store and clone from the workspace
    Delete(commands::delete::DeleteArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.global.quiet {
        "error"
    } else if cli.global.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, cli.global).await,
        Commands::Status(args) => commands::status::execute(args, cli.global).await,
        Commands::Search(args) => commands::search::execute(args, cli.global).await,
        Commands::Delete(args) => commands::delete::execute(args, cli.global).await,
    }
}
