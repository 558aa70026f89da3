//! Language-model summarization of definitions and files.

pub mod client;
pub mod error;
pub mod gist;
pub mod summarizer;

pub use client::{HttpLlmClient, HttpLlmConfig, LlmClient};
pub use error::{Result, SummarizerError};
pub use gist::parse_gist;
pub use summarizer::{summarize_full, summarize_incremental, SummaryCounts};
