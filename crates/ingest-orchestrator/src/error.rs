//! Orchestrator error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("storage/parsing error: {0}")]
    Core(#[from] ingest_core::CoreError),

    #[error("search error: {0}")]
    Search(#[from] ingest_search::SearchError),

    #[error("summarizer error: {0}")]
    Summarizer(#[from] ingest_llm::SummarizerError),

    #[error("configuration error: {0}")]
    Config(#[from] ingest_config::ConfigError),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid repo_slug '{0}': must match [A-Za-z0-9._-]+")]
    InvalidRepoSlug(String),

    #[error("unknown job {0}")]
    JobNotFound(String),

    #[error("unknown search mode '{0}'")]
    InvalidSearchMode(String),

    #[error("repository not found for slug '{0}'")]
    RepositoryNotFound(String),

    #[error("refusing to delete path outside the workspace: {0}")]
    PathEscapesWorkspace(String),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
