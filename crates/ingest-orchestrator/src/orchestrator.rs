//! Phase-sequencing job orchestration: clone, parse, summarize, embed.
//!
//! `submit` spawns the job as its own `tokio::task` and returns immediately
//! (non-blocking intake); the `JobRegistry` is how callers observe
//! progress. Every phase updates the job record's `JobProgress` before
//! doing its work, so a poller watching the record sees where a run
//! currently is.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use ingest_config::IngestConfig;
use ingest_core::{
    assign_file_to_package, build_definition_graph, build_file_graph, discover_packages,
    extract_occurrences, full_parse, incremental_parse, persist_packages, resolve_references,
    EntityType, RateBudget, Store,
};
use ingest_llm::{summarize_full, summarize_incremental, HttpLlmClient, HttpLlmConfig, LlmClient};
use ingest_search::{
    embed_and_store, hybrid_search, EmbeddingProvider, EmbeddingTarget, HttpEmbeddingProvider,
    HttpProviderConfig,
};

use crate::clone::{compare_commits, ensure_shallow_checkout};
use crate::error::{OrchestratorError, Result};
use crate::registry::JobRegistry;
use crate::types::{
    now_unix, DeleteRequest, IngestMode, IngestRequest, JobCounters, JobId, JobProgress, JobRecord,
    JobStatus, SearchMode, SearchRequest, SearchResponse, SearchResultItem, SearchResultMetadata,
};

static REPO_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap());

pub struct Orchestrator {
    config: IngestConfig,
    registry: JobRegistry,
}

impl Orchestrator {
    pub fn new(config: IngestConfig) -> Self {
        Self { config, registry: JobRegistry::new() }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub async fn status(&self, job_id: &str) -> Option<JobRecord> {
        self.registry.get(job_id).await
    }

    /// Validates and queues an ingestion run, returning its job id
    /// immediately; the run itself proceeds on a spawned task.
    pub async fn submit(self: &Arc<Self>, request: IngestRequest) -> Result<JobId> {
        if !REPO_SLUG.is_match(&request.repo_slug) {
            return Err(OrchestratorError::InvalidRepoSlug(request.repo_slug));
        }

        let job_id = new_job_id();
        let record = JobRecord::queued(job_id.clone(), request.repo_slug.clone(), now_unix());
        self.registry.insert(record).await;

        let this = self.clone_ref();
        let job_id_for_task = job_id.clone();
        tokio::spawn(async move {
            if let Err(e) = this.run(job_id_for_task.clone(), request).await {
                this.registry
                    .update(&job_id_for_task, |record| {
                        record.status = JobStatus::Failed;
                        record.progress = JobProgress::Failed;
                        record.error = Some(e.to_string());
                        record.finished_at = Some(now_unix());
                    })
                    .await;
            }
        });

        Ok(job_id)
    }

    fn clone_ref(self: &Arc<Self>) -> Arc<Self> {
        Arc::clone(self)
    }

    async fn run(&self, job_id: JobId, request: IngestRequest) -> Result<()> {
        self.registry
            .update(&job_id, |r| {
                r.status = JobStatus::Running;
                r.progress = JobProgress::Starting;
                r.started_at = Some(now_unix());
            })
            .await;

        let db_path = self.config.db_path(&request.repo_slug);
        let clone_path = self.config.clone_path(&request.repo_slug);
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Store::open(&db_path)?;

        let repository = store.get_repository_by_slug(&request.repo_slug)?;
        let previous_commit = repository.as_ref().and_then(|r| r.commit_hash.clone());
        let repository_id = match &repository {
            Some(r) => r.id,
            None => store.create_repository(&request.github_url, &request.repo_slug, "main")?,
        };

        self.registry.update(&job_id, |r| r.progress = JobProgress::CloningRepo).await;
        let repo_info = ensure_shallow_checkout(
            &clone_path,
            &request.github_url,
            request.branch.as_deref(),
            self.config.github_token.as_deref(),
        )?;

        let mode = if previous_commit.is_none() || request.force_full {
            IngestMode::Full
        } else {
            IngestMode::Incremental
        };
        self.registry.update(&job_id, |r| r.mode = Some(mode)).await;

        self.registry.update(&job_id, |r| r.progress = JobProgress::Parse).await;
        let delta = match (&mode, &previous_commit) {
            (IngestMode::Incremental, Some(before)) => {
                let changes = compare_commits(&clone_path, before, &repo_info.commit_hash)?;
                incremental_parse(&store, &clone_path, &changes)?
            }
            _ => full_parse(&store, &clone_path)?,
        };

        for discovered in discover_packages(&clone_path) {
            let packages = persist_packages(&store, repository_id, vec![discovered])?;
            let _ = assign_file_to_package("", &packages);
        }

        let changed_files: Vec<String> =
            delta.files_added.iter().chain(delta.files_modified.iter()).cloned().collect();
        let all_files: Vec<String> = store.list_files()?.into_iter().map(|f| f.file_path).collect();
        let occurrences = extract_occurrences(&store, &changed_files, &all_files)?;
        resolve_references(&store, &all_files, &occurrences)?;

        build_definition_graph(&store)?;
        build_file_graph(&store)?;

        self.registry.update(&job_id, |r| r.progress = JobProgress::Summaries).await;
        let llm_client: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::new(HttpLlmConfig {
            base_url: self.config.summarizer.base_url.clone(),
            api_key: self.config.summarizer.api_key.clone(),
            model: self.config.summarizer.model.clone(),
            timeout_secs: 120,
            max_retries: 5,
        })?);

        let mut def_budget = RateBudget::summaries_default();
        if let Some(rps) = self.config.concurrency.max_requests_per_second {
            def_budget.max_requests_per_second = rps;
        }
        let file_budget = def_budget;

        let summary_counts = match &mode {
            IngestMode::Full => summarize_full(&store, llm_client.clone(), def_budget, file_budget).await?,
            IngestMode::Incremental => {
                summarize_incremental(&store, llm_client.clone(), &delta, def_budget, file_budget).await?
            }
        };

        self.registry.update(&job_id, |r| r.progress = JobProgress::Embeddings).await;
        let embedding_provider: Arc<dyn EmbeddingProvider> = Arc::new(HttpEmbeddingProvider::new(HttpProviderConfig {
            base_url: self.config.embeddings.base_url.clone(),
            api_key: self.config.embeddings.api_key.clone(),
            model: self.config.embeddings.model.clone(),
            timeout_secs: 30,
            max_retries: 3,
            azure_mode: false,
        })?);
        let targets = embedding_targets(&store, &summary_counts.definition_ids, &summary_counts.file_ids)?;
        let embeddings_written =
            embed_and_store(&store, embedding_provider, targets, &self.config.embeddings.model).await?;

        self.registry.update(&job_id, |r| r.progress = JobProgress::Finalize).await;
        store.set_commit_hash(repository_id, &repo_info.commit_hash)?;

        self.registry
            .update(&job_id, |r| {
                r.status = JobStatus::Succeeded;
                r.progress = JobProgress::Completed;
                r.commit = Some(repo_info.commit_hash.clone());
                r.counters = Some(JobCounters {
                    files_parsed: delta.files_added.len() + delta.files_modified.len(),
                    definitions_summarized: summary_counts.definitions,
                    files_summarized: summary_counts.files,
                    embeddings_written,
                });
                r.finished_at = Some(now_unix());
            })
            .await;

        Ok(())
    }

    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        if request.top_k == 0 || request.top_k > 200 {
            return Err(OrchestratorError::InvalidSearchMode(format!(
                "top_k {} out of range [1,200]",
                request.top_k
            )));
        }

        let db_path = self.config.db_path(&request.repo_slug);
        let store = Store::open(&db_path)?;

        let embedding_provider = HttpEmbeddingProvider::new(HttpProviderConfig {
            base_url: self.config.embeddings.base_url.clone(),
            api_key: self.config.embeddings.api_key.clone(),
            model: self.config.embeddings.model.clone(),
            timeout_secs: 30,
            max_retries: 3,
            azure_mode: false,
        })?;

        let (include_vector, include_text) = match request.mode {
            SearchMode::Semantic => (true, false),
            SearchMode::Symbol => (false, true),
            SearchMode::Path | SearchMode::Hybrid => (true, true),
        };

        let hits = hybrid_search(
            &store,
            &embedding_provider,
            &request.query,
            request.top_k,
            include_vector,
            include_text,
        )
        .await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            if let Some(entity_types) = &request.entity_types {
                if !entity_types.iter().any(|t| t == hit.entity_type.as_str()) {
                    continue;
                }
            }
            let (entity_name, file_path, language, definition_type, summary_text) = match hit.entity_type {
                EntityType::Definition => {
                    let Some(def) = store.get_definition(hit.entity_id)? else { continue };
                    let file_path = store.get_file(def.file_id)?.map(|f| f.file_path).unwrap_or_default();
                    (
                        def.name,
                        file_path,
                        None,
                        Some(format!("{:?}", def.kind)),
                        def.ai_short_summary.or(def.ai_summary).unwrap_or_default(),
                    )
                }
                EntityType::File => {
                    let Some(file) = store.get_file(hit.entity_id)? else { continue };
                    (
                        file.file_path.clone(),
                        file.file_path,
                        Some(file.language),
                        None,
                        file.ai_short_summary.or(file.ai_summary).unwrap_or_default(),
                    )
                }
            };

            results.push(SearchResultItem {
                entity_type: hit.entity_type.as_str().to_string(),
                entity_id: hit.entity_id,
                similarity_score: hit.score.clamp(0.0, 1.0),
                summary_text,
                metadata: SearchResultMetadata {
                    entity_type: hit.entity_type.as_str().to_string(),
                    entity_id: hit.entity_id,
                    entity_name,
                    file_path,
                    language,
                    definition_type,
                },
            });
        }

        results.truncate(request.top_k);
        let max_similarity = results.iter().map(|r| r.similarity_score).fold(0.0_f32, f32::max);
        let min_similarity = results
            .iter()
            .map(|r| r.similarity_score)
            .fold(1.0_f32, f32::min);

        Ok(SearchResponse {
            query: request.query,
            total_results: results.len(),
            results,
            max_similarity,
            min_similarity,
        })
    }

    /// Removes a repository's store and clone, both guaranteed to remain
    /// inside the workspace directory.
    pub fn delete(&self, request: DeleteRequest) -> Result<()> {
        let db_path = self.config.db_path(&request.repo_slug);
        let clone_path = self.config.clone_path(&request.repo_slug);
        for path in [&db_path, &clone_path] {
            ensure_within_workspace(&self.config.storage.db_dir, path)?;
        }

        if db_path.exists() {
            std::fs::remove_file(&db_path)?;
        }
        if clone_path.exists() {
            std::fs::remove_dir_all(&clone_path)?;
        }
        Ok(())
    }
}

/// Builds embedding targets for exactly the definitions and files that were
/// (re)summarized this run, so incremental jobs don't re-embed the whole
/// store.
fn embedding_targets(store: &Store, definition_ids: &[i64], file_ids: &[i64]) -> Result<Vec<EmbeddingTarget>> {
    let mut targets = Vec::with_capacity(definition_ids.len() + file_ids.len());

    for &id in definition_ids {
        let Some(def) = store.get_definition(id)? else { continue };
        let file = store.get_file(def.file_id)?;
        let text = def.ai_summary.clone().or_else(|| def.ai_short_summary.clone()).unwrap_or(def.source_code);
        targets.push(EmbeddingTarget {
            entity_type: EntityType::Definition,
            entity_id: def.id,
            text,
            entity_name: def.name,
            file_path: file.as_ref().map(|f| f.file_path.clone()).unwrap_or_default(),
            language: file.map(|f| f.language),
            definition_type: Some(format!("{:?}", def.kind)),
        });
    }

    for &id in file_ids {
        let Some(file) = store.get_file(id)? else { continue };
        let text =
            file.ai_summary.clone().or_else(|| file.ai_short_summary.clone()).unwrap_or(file.file_content);
        targets.push(EmbeddingTarget {
            entity_type: EntityType::File,
            entity_id: file.id,
            text,
            entity_name: file.file_path.clone(),
            file_path: file.file_path,
            language: Some(file.language),
            definition_type: None,
        });
    }

    Ok(targets)
}

fn ensure_within_workspace(workspace: &std::path::Path, candidate: &std::path::Path) -> Result<()> {
    let workspace = workspace.canonicalize().unwrap_or_else(|_| workspace.to_path_buf());
    let parent = candidate.parent().unwrap_or(candidate);
    let resolved = parent.canonicalize().unwrap_or_else(|_| parent.to_path_buf());
    if !resolved.starts_with(&workspace) {
        return Err(OrchestratorError::PathEscapesWorkspace(candidate.display().to_string()));
    }
    Ok(())
}

fn new_job_id() -> JobId {
    uuid::Uuid::new_v4().to_string()
}
