//! Hybrid search: merge brute-force vector similarity with FTS5 BM25
//! full-text ranking into one ranked hit list, grounded on the teacher's
//! `hybrid.rs` merge idea but against this crate's colocated SQLite indexes
//! (`Store::nearest_neighbors`/`fts_search_*`) instead of a separate Qdrant
//! collection, and on the original's `SemanticSearchProcessor.hybrid_search`
//! for the merge rule itself: concatenate both signals' rows, then
//! deduplicate by `(entity_type, entity_id)` keeping whichever row has the
//! lowest `distance` — no weighted blending of the two signals.

use std::cmp::Ordering;
use std::collections::HashMap;

use ingest_core::model::{EntityType, Id};
use ingest_core::storage::vector::distance_to_similarity;
use ingest_core::storage::Store;

use crate::error::Result;
use crate::provider::EmbeddingProvider;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub entity_type: EntityType,
    pub entity_id: Id,
    /// Lower is better: raw vector distance, or the BM25 `rank` for an FTS
    /// hit (SQLite's `bm25()` is more negative for a better match).
    pub distance: f32,
    /// `1 / (1 + distance)`, for callers that expect a `[0, 1]` similarity.
    pub score: f32,
    pub matched_vector: bool,
    pub matched_text: bool,
}

/// A candidate's best-so-far distance while merging, plus which signals it
/// was seen in regardless of which one is currently winning.
struct Candidate {
    distance: f32,
    matched_vector: bool,
    matched_text: bool,
}

/// Embeds `query` (when `include_vector`), runs it against the vector index
/// and/or both FTS tables, and merges the results, deduplicating by
/// `(entity_type, entity_id)` and keeping the lowest-distance row.
pub async fn hybrid_search(
    store: &Store,
    provider: &dyn EmbeddingProvider,
    query: &str,
    top_k: usize,
    include_vector: bool,
    include_text: bool,
) -> Result<Vec<SearchHit>> {
    // Over-fetch each side so a candidate that wins on only one signal isn't
    // starved by `top_k` before the merge even happens.
    let fetch_k = (top_k * 3).max(top_k);

    let vector_hits = if include_vector {
        let query_vectors = provider.embed(vec![query.to_string()]).await?;
        let query_vector = query_vectors.into_iter().next().unwrap_or_default();
        if query_vector.is_empty() {
            Vec::new()
        } else {
            store.nearest_neighbors(&query_vector, fetch_k, None)?
        }
    } else {
        Vec::new()
    };

    let (definition_hits, file_hits) = if include_text {
        (store.fts_search_definitions(query, fetch_k)?, store.fts_search_files(query, fetch_k)?)
    } else {
        (Vec::new(), Vec::new())
    };

    let mut candidates: HashMap<(EntityType, Id), Candidate> = HashMap::new();

    for hit in &vector_hits {
        merge_candidate(&mut candidates, (hit.entity_type, hit.entity_id), hit.distance, true, false);
    }
    for (id, rank) in &definition_hits {
        merge_candidate(&mut candidates, (EntityType::Definition, *id), *rank, false, true);
    }
    for (id, rank) in &file_hits {
        merge_candidate(&mut candidates, (EntityType::File, *id), *rank, false, true);
    }

    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .map(|((entity_type, entity_id), c)| SearchHit {
            entity_type,
            entity_id,
            distance: c.distance,
            score: distance_to_similarity(c.distance),
            matched_vector: c.matched_vector,
            matched_text: c.matched_text,
        })
        .collect();

    hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
    hits.truncate(top_k);
    Ok(hits)
}

fn merge_candidate(
    candidates: &mut HashMap<(EntityType, Id), Candidate>,
    key: (EntityType, Id),
    distance: f32,
    from_vector: bool,
    from_text: bool,
) {
    candidates
        .entry(key)
        .and_modify(|c| {
            c.matched_vector |= from_vector;
            c.matched_text |= from_text;
            if distance < c.distance {
                c.distance = distance;
            }
        })
        .or_insert(Candidate { distance, matched_vector: from_vector, matched_text: from_text });
}
