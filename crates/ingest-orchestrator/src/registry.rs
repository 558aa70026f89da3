//! In-memory registry of in-flight and completed jobs.
//!
//! An explicit `Arc<RwLock<HashMap<JobId, JobRecord>>>` rather than a
//! process-wide static, so each orchestrator instance owns its own job
//! bookkeeping — multiple instances (e.g. in tests) never share state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::types::{JobId, JobRecord};

#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: JobRecord) {
        self.jobs.write().await.insert(record.job_id.clone(), record);
    }

    pub async fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.read().await.get(job_id).cloned()
    }

    pub async fn update(&self, job_id: &str, f: impl FnOnce(&mut JobRecord)) {
        if let Some(record) = self.jobs.write().await.get_mut(job_id) {
            f(record);
        }
    }

    pub async fn list(&self) -> Vec<JobRecord> {
        self.jobs.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JobProgress, JobStatus};

    #[tokio::test]
    async fn insert_and_get_round_trips() {
        let registry = JobRegistry::new();
        let record = JobRecord::queued("job-1".into(), "acme/widgets".into(), 0);
        registry.insert(record).await;

        let fetched = registry.get("job-1").await.unwrap();
        assert_eq!(fetched.status, JobStatus::Queued);
        assert_eq!(fetched.progress, JobProgress::Queued);
    }

    #[tokio::test]
    async fn update_mutates_in_place() {
        let registry = JobRegistry::new();
        registry.insert(JobRecord::queued("job-1".into(), "acme/widgets".into(), 0)).await;

        registry
            .update("job-1", |record| {
                record.status = JobStatus::Running;
                record.progress = JobProgress::Parse;
            })
            .await;

        let fetched = registry.get("job-1").await.unwrap();
        assert_eq!(fetched.status, JobStatus::Running);
        assert_eq!(fetched.progress, JobProgress::Parse);
    }

    #[tokio::test]
    async fn unknown_job_is_none() {
        let registry = JobRegistry::new();
        assert!(registry.get("missing").await.is_none());
    }
}
