//! Request/response and job-bookkeeping types for the orchestrator.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub type JobId = String;

/// Accepted at the system boundary to start an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    pub github_url: String,
    pub repo_slug: String,
    pub branch: Option<String>,
    #[serde(default)]
    pub force_full: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobProgress {
    Queued,
    Starting,
    CloningRepo,
    Parse,
    Summaries,
    Embeddings,
    Finalize,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    Full,
    Incremental,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobCounters {
    pub files_parsed: usize,
    pub definitions_summarized: usize,
    pub files_summarized: usize,
    pub embeddings_written: usize,
}

/// A snapshot of one job's state, returned by status polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub repo_slug: String,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub mode: Option<IngestMode>,
    pub commit: Option<String>,
    pub counters: Option<JobCounters>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,
}

impl JobRecord {
    pub fn queued(job_id: JobId, repo_slug: String, now: u64) -> Self {
        Self {
            job_id,
            repo_slug,
            status: JobStatus::Queued,
            progress: JobProgress::Queued,
            mode: None,
            commit: None,
            counters: None,
            warnings: Vec::new(),
            error: None,
            created_at: now,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Wall-clock seconds since the epoch; timestamps are stamped by the caller
/// (orchestrator scripts run outside a sandboxed clock, this crate's own
/// tests pass in a fixed value instead of calling this directly).
pub fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Semantic,
    Symbol,
    Path,
    Hybrid,
}

impl Default for SearchMode {
    fn default() -> Self {
        Self::Hybrid
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub repo_slug: String,
    pub query: String,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    pub entity_types: Option<Vec<String>>,
}

fn default_top_k() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultMetadata {
    pub entity_type: String,
    pub entity_id: i64,
    pub entity_name: String,
    pub file_path: String,
    pub language: Option<String>,
    pub definition_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub entity_type: String,
    pub entity_id: i64,
    pub similarity_score: f32,
    pub summary_text: String,
    pub metadata: SearchResultMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<SearchResultItem>,
    pub max_similarity: f32,
    pub min_similarity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub repo_slug: String,
}
