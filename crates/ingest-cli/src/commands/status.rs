//! Status command - one-shot poll of a job's progress.

use anyhow::{bail, Result};
use clap::Args;

use super::load_orchestrator;
use crate::GlobalOptions;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Job id returned by `ingest run`
    job_id: String,

    /// Print the full job record as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the status command.
pub async fn execute(args: StatusArgs, global: GlobalOptions) -> Result<()> {
    let orchestrator = load_orchestrator(&global)?;

    let Some(record) = orchestrator.status(&args.job_id).await else {
        bail!("unknown job {}", args.job_id);
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("job       {}", record.job_id);
    println!("repo      {}", record.repo_slug);
    println!("status    {:?}", record.status);
    println!("progress  {:?}", record.progress);
    if let Some(mode) = record.mode {
        println!("mode      {mode:?}");
    }
    if let Some(commit) = &record.commit {
        println!("commit    {commit}");
    }
    if let Some(counters) = &record.counters {
        println!("counters  {counters:?}");
    }
    for warning in &record.warnings {
        println!("warning   {warning}");
    }
    if let Some(error) = &record.error {
        println!("error     {error}");
    }

    Ok(())
}
