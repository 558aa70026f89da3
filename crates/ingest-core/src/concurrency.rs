//! The cooperative task pool shared by the summarizer and the embedder.
//!
//! A **level** is a list of **groups** (node-id sets); groups within a level
//! have no dependency edges between them and may run concurrently, bounded
//! by a semaphore, in batches, with a rate-limit sleep between batches. This
//! is the single mechanism both `ingest-llm`'s summarizer and
//! `ingest-search`'s embedder drive their work through.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// A single group's failure: either the group's own operation failed, or it
/// was still running when its per-task timeout elapsed.
#[derive(Debug, Error)]
pub enum LevelError<E: fmt::Debug> {
    #[error("{0:?}")]
    Failed(E),
    #[error("task exceeded its timeout")]
    TimedOut,
}

#[derive(Debug, Error)]
#[error("{} task(s) in batch failed", .0.len())]
pub struct BatchError<E: fmt::Debug>(pub Vec<LevelError<E>>);

/// Tunables for one invocation of `run_level` / `run_levels`.
#[derive(Debug, Clone, Copy)]
pub struct RateBudget {
    /// Maximum concurrently in-flight group operations.
    pub max_concurrent: usize,
    /// Batches are capped at this many groups.
    pub min_batch_size: usize,
    /// Requests-per-second budget; governs the inter-batch sleep, not
    /// in-batch concurrency.
    pub max_requests_per_second: f64,
    /// Per-task timeout.
    pub task_timeout: Duration,
}

impl RateBudget {
    pub fn summaries_default() -> Self {
        Self {
            max_concurrent: 20,
            min_batch_size: 50,
            max_requests_per_second: 15.0,
            task_timeout: Duration::from_secs(600),
        }
    }

    pub fn embeddings_default() -> Self {
        Self {
            max_concurrent: 4,
            min_batch_size: 100,
            max_requests_per_second: 3000.0 / 60.0,
            task_timeout: Duration::from_secs(300),
        }
    }
}

/// Run a single level (a list of groups) to completion.
///
/// `op` is invoked once per group and must return `Ok(true)` if it did
/// productive work (so the rate-limit sleep only triggers after a batch
/// that actually generated output), `Ok(false)` if it was a no-op (e.g. the
/// group was already fully cached), or `Err` on failure.
///
/// All errors in a batch are collected; the first batch to fail aborts the
/// level with a `BatchError` naming every failure in that batch.
pub async fn run_level<G, E, F, Fut>(
    groups: Vec<G>,
    budget: RateBudget,
    op: F,
) -> Result<(), BatchError<E>>
where
    G: Send + 'static,
    E: fmt::Debug + Send + 'static,
    F: Fn(G) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
{
    if groups.is_empty() {
        return Ok(());
    }

    let op = Arc::new(op);
    let semaphore = Arc::new(Semaphore::new(budget.max_concurrent.max(1)));
    let batch_size = budget.min_batch_size.min(groups.len()).max(1);
    let total_batches = groups.len().div_ceil(batch_size);

    let mut remaining = groups;
    let mut batch_index = 0usize;

    while !remaining.is_empty() {
        let take = batch_size.min(remaining.len());
        let batch: Vec<G> = remaining.drain(..take).collect();
        batch_index += 1;
        let is_last_batch = batch_index >= total_batches;

        let mut handles = Vec::with_capacity(batch.len());
        for group in batch {
            let sem = semaphore.clone();
            let op = op.clone();
            let task_timeout = budget.task_timeout;
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.expect("semaphore closed");
                match timeout(task_timeout, op(group)).await {
                    Ok(Ok(produced)) => Ok(produced),
                    Ok(Err(e)) => Err(LevelError::Failed(e)),
                    Err(_) => Err(LevelError::TimedOut),
                }
            }));
        }

        let mut errors = Vec::new();
        let mut did_work = false;
        for handle in handles {
            match handle.await {
                Ok(Ok(produced)) => did_work = did_work || produced,
                Ok(Err(level_err)) => errors.push(level_err),
                Err(join_err) => {
                    tracing::error!(error = %join_err, "task panicked during level execution");
                }
            }
        }

        if !errors.is_empty() {
            return Err(BatchError(errors));
        }

        if did_work && !is_last_batch && budget.max_requests_per_second > 0.0 {
            let delay = take as f64 / budget.max_requests_per_second;
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
        }
    }

    Ok(())
}

/// Run every level in order; levels are strict barriers (level N+1 does not
/// start until level N has fully committed).
pub async fn run_levels<G, E, F, Fut>(
    levels: Vec<Vec<G>>,
    budget: RateBudget,
    op: F,
) -> Result<(), BatchError<E>>
where
    G: Send + 'static,
    E: fmt::Debug + Send + 'static,
    F: Fn(G) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
{
    let op = Arc::new(op);
    for level in levels {
        let op = op.clone();
        run_level(level, budget, move |g| {
            let op = op.clone();
            async move { op(g).await }
        })
        .await?;
    }
    Ok(())
}
