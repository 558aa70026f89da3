//! Error types for `ingest-llm`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummarizerError {
    #[error("storage error: {0}")]
    Storage(#[from] ingest_core::CoreError),

    #[error("language model unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("language model authentication failed: {0}")]
    Auth(String),

    #[error("language model response missing <gist> delimiters")]
    MalformedResponse,

    #[error("joint summary response missing a section for entity {0}")]
    MissingJointSection(i64),

    #[error("missing dependency summaries for {entity_id}: {names:?}")]
    MissingDependencies { entity_id: i64, names: Vec<String> },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("summarization level failed: {0}")]
    LevelFailed(String),
}

pub type Result<T> = std::result::Result<T, SummarizerError>;
