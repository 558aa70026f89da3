//! Search command - semantic/symbol/hybrid search over an ingested repository.

use anyhow::Result;
use clap::{Args, ValueEnum};
use ingest_orchestrator::{SearchMode as OrchestratorSearchMode, SearchRequest};

use super::load_orchestrator;
use crate::GlobalOptions;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SearchMode {
    Semantic,
    Symbol,
    Path,
    Hybrid,
}

impl From<SearchMode> for OrchestratorSearchMode {
    fn from(mode: SearchMode) -> Self {
        match mode {
            SearchMode::Semantic => OrchestratorSearchMode::Semantic,
            SearchMode::Symbol => OrchestratorSearchMode::Symbol,
            SearchMode::Path => OrchestratorSearchMode::Path,
            SearchMode::Hybrid => OrchestratorSearchMode::Hybrid,
        }
    }
}

/// Arguments for the search command.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Slug of the repository to search
    repo_slug: String,

    /// Search query
    query: String,

    /// Search mode
    #[arg(long, short = 'm', value_enum, default_value = "hybrid")]
    mode: SearchMode,

    /// Maximum number of results
    #[arg(long, short = 'n', default_value = "10")]
    top_k: usize,

    /// Restrict to these entity types (file, definition)
    #[arg(long)]
    entity_type: Vec<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the search command.
pub async fn execute(args: SearchArgs, global: GlobalOptions) -> Result<()> {
    let orchestrator = load_orchestrator(&global)?;

    let response = orchestrator
        .search(SearchRequest {
            repo_slug: args.repo_slug,
            query: args.query.clone(),
            mode: args.mode.into(),
            top_k: args.top_k,
            entity_types: (!args.entity_type.is_empty()).then_some(args.entity_type),
        })
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.results.is_empty() {
        if !global.quiet {
            eprintln!("no results for: {}", args.query);
        }
        return Ok(());
    }

    if !global.quiet {
        println!("{} results for \"{}\":\n", response.total_results, args.query);
    }

    for (i, result) in response.results.iter().enumerate() {
        println!(
            "{}. {} ({})  score {:.3}",
            i + 1,
            result.metadata.entity_name,
            result.metadata.entity_type,
            result.similarity_score,
        );
        println!("   {}", result.metadata.file_path);
        println!("   {}", result.summary_text);
        println!();
    }

    Ok(())
}
