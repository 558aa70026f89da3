//! Run command - submit an ingestion job and wait for it to finish.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use ingest_orchestrator::{IngestRequest, JobStatus};

use super::{load_orchestrator, print_info};
use crate::progress::{finish_spinner, finish_spinner_warn, spinner};
use crate::GlobalOptions;

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Slug identifying this repository in the workspace (filename-safe)
    repo_slug: String,

    /// GitHub URL to clone
    github_url: String,

    /// Branch to ingest (defaults to the repository's default branch)
    #[arg(long)]
    branch: Option<String>,

    /// Ignore any previously recorded commit and re-ingest from scratch
    #[arg(long)]
    force_full: bool,

    /// Submit the job and return its id immediately, without waiting
    #[arg(long)]
    no_wait: bool,
}

/// Execute the run command.
pub async fn execute(args: RunArgs, global: GlobalOptions) -> Result<()> {
    let orchestrator = load_orchestrator(&global)?;

    let job_id = orchestrator
        .submit(IngestRequest {
            github_url: args.github_url,
            repo_slug: args.repo_slug.clone(),
            branch: args.branch,
            force_full: args.force_full,
        })
        .await?;

    if args.no_wait {
        println!("{job_id}");
        return Ok(());
    }

    let pb = spinner(&format!("queued ({job_id})"), global.quiet);
    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let Some(record) = orchestrator.status(&job_id).await else {
            bail!("job {job_id} disappeared from the registry");
        };

        if let Some(pb) = &pb {
            pb.set_message(format!("{:?}", record.progress));
        }

        match record.status {
            JobStatus::Succeeded => {
                finish_spinner(pb, &format!("ingested {} at {:?}", args.repo_slug, record.commit));
                if let Some(counters) = &record.counters {
                    print_info(&format!("{counters:?}"), global.quiet);
                }
                return Ok(());
            }
            JobStatus::Failed => {
                let error = record.error.unwrap_or_default();
                finish_spinner_warn(pb, &format!("ingestion failed: {error}"));
                bail!("ingestion failed: {error}");
            }
            JobStatus::Queued | JobStatus::Running => continue,
        }
    }
}
