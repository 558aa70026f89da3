//! Job orchestration for the ingestion pipeline.
//!
//! [`Orchestrator`] sequences one repository's run through cloning, parsing,
//! summarization, and embedding, tracking progress in a [`JobRegistry`] that
//! a caller can poll by job id. `submit` queues a run and returns
//! immediately; the run itself proceeds on a spawned task.
//!
//! ```ignore
//! use ingest_orchestrator::{IngestRequest, Orchestrator};
//! use ingest_config::IngestConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> ingest_orchestrator::Result<()> {
//!     let orchestrator = Arc::new(Orchestrator::new(IngestConfig::load()?));
//!     let job_id = orchestrator
//!         .submit(IngestRequest {
//!             github_url: "https://github.com/acme/widgets".into(),
//!             repo_slug: "acme-widgets".into(),
//!             branch: None,
//!             force_full: false,
//!         })
//!         .await?;
//!     println!("queued {job_id}");
//!     Ok(())
//! }
//! ```

mod clone;
mod error;
mod orchestrator;
mod registry;
mod types;

pub use clone::{compare_commits, ensure_shallow_checkout, RepoInfo};
pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;
pub use registry::JobRegistry;
pub use types::*;

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
