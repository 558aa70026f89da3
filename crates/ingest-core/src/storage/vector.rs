//! Packing/unpacking and brute-force scoring for the embedding "vector
//! index". A real `sqlite-vec` virtual table is a loadable SQLite extension
//! this workspace does not vendor; instead the index is the ordinary
//! `embeddings` table itself, scanned and scored in-process. The contract
//! the rest of the pipeline depends on — `rowid = embeddings.id`, ascending
//! distance order, optional `entity_type` filter — is preserved regardless.

use crate::model::{EntityType, Id};

/// Pack a float vector as little-endian float32 bytes, matching the wire
/// format the embeddings table stores (and the one the reference
/// implementation produces via `array("f", vec).tobytes()`).
pub fn pack_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

pub fn unpack_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Squared Euclidean distance, the metric the reference `vec0` virtual
/// table uses by default for `float[]` columns.
pub fn squared_euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Map a distance to a `[0, 1]` similarity score, per the spec's similarity
/// mapping (`distance -> 1 / (1 + distance)`).
pub fn distance_to_similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

#[derive(Debug, Clone)]
pub struct NearestNeighbor {
    pub embedding_id: Id,
    pub entity_type: EntityType,
    pub entity_id: Id,
    pub distance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trips() {
        let v = vec![0.5_f32, -1.25, 3.0];
        let bytes = pack_vector(&v);
        assert_eq!(bytes.len(), 12);
        let back = unpack_vector(&bytes);
        assert_eq!(back, v);
    }

    #[test]
    fn similarity_mapping_matches_spec_formula() {
        assert!((distance_to_similarity(0.0) - 1.0).abs() < 1e-6);
        assert!((distance_to_similarity(1.0) - 0.5).abs() < 1e-6);
    }
}
