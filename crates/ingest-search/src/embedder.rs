//! Batched embedding upsert, scheduled through the same rate-limited
//! level-execution primitive the summarizer uses (SPEC_FULL.md §5's
//! `embeddings_default` budget: 4 concurrent requests, 3000/min, batches of
//! 100).
//!
//! Targets are first chunked into batches of `min_batch_size`; each batch is
//! one group handed to `ingest_core::concurrency::run_level`, which embeds
//! it with a single `provider.embed(texts)` call covering the whole batch
//! rather than one call per target. Batches run concurrently under the
//! semaphore `run_level` already provides; `rusqlite::Connection` isn't
//! `Sync`, so writes are collected into a shared buffer during the
//! concurrent phase and flushed to the store serially once every batch in
//! the level has finished.

use std::sync::Arc;

use tokio::sync::Mutex;

use ingest_core::concurrency::{run_level, RateBudget};
use ingest_core::model::{EntityType, Id};
use ingest_core::storage::{vector::pack_vector, Store};

use crate::error::Result;
use crate::provider::EmbeddingProvider;

/// One entity awaiting an embedding.
#[derive(Debug, Clone)]
pub struct EmbeddingTarget {
    pub entity_type: EntityType,
    pub entity_id: Id,
    pub text: String,
    pub entity_name: String,
    pub file_path: String,
    pub language: Option<String>,
    pub definition_type: Option<String>,
}

struct Embedded {
    target: EmbeddingTarget,
    vector: Vec<f32>,
}

/// Embeds and upserts `targets`, returning how many embeddings were written.
pub async fn embed_and_store(
    store: &Store,
    provider: Arc<dyn EmbeddingProvider>,
    targets: Vec<EmbeddingTarget>,
    model_name: &str,
) -> Result<usize> {
    if targets.is_empty() {
        return Ok(0);
    }

    let budget = RateBudget::embeddings_default();
    let batches: Vec<Vec<EmbeddingTarget>> =
        targets.chunks(budget.min_batch_size.max(1)).map(<[EmbeddingTarget]>::to_vec).collect();

    let results: Arc<Mutex<Vec<Embedded>>> = Arc::new(Mutex::new(Vec::new()));

    let results_for_op = results.clone();
    let provider_for_op = provider.clone();
    run_level(batches, budget, move |batch: Vec<EmbeddingTarget>| {
        let results = results_for_op.clone();
        let provider = provider_for_op.clone();
        async move {
            let texts: Vec<String> = batch.iter().map(|target| target.text.clone()).collect();
            let vectors = provider.embed(texts).await?;

            let mut results = results.lock().await;
            for (target, vector) in batch.into_iter().zip(vectors) {
                results.push(Embedded { target, vector });
            }
            Ok::<bool, crate::error::SearchError>(true)
        }
    })
    .await
    .map_err(|e| crate::error::SearchError::ProviderUnavailable(format!("{e}")))?;

    let embedded = Arc::try_unwrap(results)
        .map(Mutex::into_inner)
        .unwrap_or_default();

    let dims = provider.embedding_dim() as u32;
    let mut written = 0;
    for item in embedded {
        let t = &item.target;
        store.upsert_embedding(
            t.entity_type,
            t.entity_id,
            &pack_vector(&item.vector),
            model_name,
            dims,
            &t.entity_name,
            &t.file_path,
            t.language.as_deref(),
            t.definition_type.as_deref(),
        )?;
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FakeProvider;

    #[async_trait]
    impl EmbeddingProvider for FakeProvider {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32; 4]).collect())
        }

        fn embedding_dim(&self) -> usize {
            4
        }
    }

    #[tokio::test]
    async fn embeds_and_persists_every_target() {
        let store = Store::open_in_memory().unwrap();
        let file_id = store.insert_file(None, "a.rs", "rust", "").unwrap();

        let targets = vec![EmbeddingTarget {
            entity_type: EntityType::File,
            entity_id: file_id,
            text: "file contents".into(),
            entity_name: "a.rs".into(),
            file_path: "a.rs".into(),
            language: Some("rust".into()),
            definition_type: None,
        }];

        let written = embed_and_store(&store, Arc::new(FakeProvider), targets, "fake-model")
            .await
            .unwrap();
        assert_eq!(written, 1);

        let neighbors = store.nearest_neighbors(&[13.0; 4], 5, None).unwrap();
        assert_eq!(neighbors.len(), 1);
    }

    struct CountingProvider {
        calls: std::sync::Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            self.calls.lock().unwrap().push(texts.len());
            Ok(texts.iter().map(|t| vec![t.len() as f32; 4]).collect())
        }

        fn embedding_dim(&self) -> usize {
            4
        }
    }

    #[tokio::test]
    async fn one_batch_of_targets_is_embedded_in_a_single_call() {
        let store = Store::open_in_memory().unwrap();

        let targets: Vec<EmbeddingTarget> = (0..5)
            .map(|i| EmbeddingTarget {
                entity_type: EntityType::Definition,
                entity_id: i + 1,
                text: format!("definition {i}"),
                entity_name: format!("def_{i}"),
                file_path: "a.rs".into(),
                language: Some("rust".into()),
                definition_type: Some("function".into()),
            })
            .collect();

        let provider = Arc::new(CountingProvider { calls: std::sync::Mutex::new(Vec::new()) });
        let written = embed_and_store(&store, provider.clone(), targets, "fake-model").await.unwrap();

        assert_eq!(written, 5);
        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1, "expected one embed() call covering the whole batch, got {calls:?}");
        assert_eq!(calls[0], 5);
    }
}
