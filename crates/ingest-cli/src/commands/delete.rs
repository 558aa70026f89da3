//! Delete command - remove a repository's store and clone from the workspace.

use anyhow::Result;
use clap::Args;

use super::{load_orchestrator, print_info};
use crate::GlobalOptions;
use ingest_orchestrator::DeleteRequest;

/// Arguments for the delete command.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Slug of the repository to remove
    repo_slug: String,
}

/// Execute the delete command.
pub async fn execute(args: DeleteArgs, global: GlobalOptions) -> Result<()> {
    let orchestrator = load_orchestrator(&global)?;
    orchestrator.delete(DeleteRequest { repo_slug: args.repo_slug.clone() })?;
    print_info(&format!("removed {}", args.repo_slug), global.quiet);
    Ok(())
}
