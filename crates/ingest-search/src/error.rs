//! Error types for `ingest-search`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("storage error: {0}")]
    Storage(#[from] ingest_core::CoreError),

    #[error("embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding provider authentication failed: {0}")]
    Auth(String),

    #[error("embedding provider rate limited, retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    #[error("embedding model not found: {0}")]
    InvalidModel(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;
