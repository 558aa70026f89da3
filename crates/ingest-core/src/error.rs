//! Error types for `ingest-core`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("repository path not found: {0}")]
    RepoNotFound(PathBuf),

    #[error("unsupported language for extension: {0}")]
    UnsupportedExtension(String),

    #[error("grammar initialization failed for language {language}: {message}")]
    GrammarInit { language: String, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
