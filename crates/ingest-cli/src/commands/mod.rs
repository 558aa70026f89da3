//! CLI command implementations.

pub mod delete;
pub mod run;
pub mod search;
pub mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use ingest_config::{ConfigLoader, IngestConfig};
use ingest_orchestrator::Orchestrator;

use crate::GlobalOptions;

/// Loads configuration for the workspace named in `global`, applying the
/// `--config` override if one was given, then builds an `Orchestrator` over it.
pub fn load_orchestrator(global: &GlobalOptions) -> Result<Arc<Orchestrator>> {
    let config = load_config(global)?;
    Ok(Arc::new(Orchestrator::new(config)))
}

fn load_config(global: &GlobalOptions) -> Result<IngestConfig> {
    let mut loader = ConfigLoader::new();

    let config = if let Some(config_path) = &global.config {
        let parent = config_path.parent().unwrap_or(&global.workspace);
        loader
            .load_local(parent)
            .context("failed to load configuration")?
            .ok_or_else(|| anyhow::anyhow!("config file not found: {}", config_path.display()))?
    } else {
        loader.load(&global.workspace).context("failed to load configuration")?
    };

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Print an info message to stderr, respecting `--quiet`.
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}
