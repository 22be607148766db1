//! Vector store seam.
//!
//! Spec §1 treats the nearest-neighbor vector index as an external,
//! black-box collaborator. This module defines the trait the semantic
//! search channel (§4.C9) depends on, plus a brute-force cosine in-memory
//! implementation grounded on the teacher's `vector::clustering::cosine_similarity`
//! scoring, simplified from its IVFFlat+mmap engine since persistence and
//! ANN indexing are out of scope here.

use crate::ids::ChunkId;

pub trait VectorStore: Send + Sync {
    fn upsert(&mut self, id: ChunkId, vector: Vec<f32>);

    /// Returns up to `k` nearest neighbors to `query`, ranked by descending
    /// cosine similarity.
    fn search(&self, query: &[f32], k: usize) -> Vec<(ChunkId, f32)>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Brute-force, in-memory cosine-similarity store. Adequate for the index
/// sizes this system targets (tens of thousands of chunks); a production
/// deployment would swap this for an IVFFlat or HNSW-backed engine behind
/// the same trait.
#[derive(Default)]
pub struct InMemoryVectorStore {
    entries: Vec<(ChunkId, Vec<f32>)>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

impl VectorStore for InMemoryVectorStore {
    fn upsert(&mut self, id: ChunkId, vector: Vec<f32>) {
        if let Some(slot) = self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            slot.1 = vector;
        } else {
            self.entries.push((id, vector));
        }
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(ChunkId, f32)> {
        let mut scored: Vec<(ChunkId, f32)> = self.entries.iter().map(|(id, v)| (*id, cosine_similarity(query, v))).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_ranks_identical_vector_highest() {
        let mut store = InMemoryVectorStore::new();
        let a = ChunkId::new();
        let b = ChunkId::new();
        store.upsert(a, vec![1.0, 0.0, 0.0]);
        store.upsert(b, vec![0.0, 1.0, 0.0]);

        let results = store.search(&[1.0, 0.0, 0.0], 2);
        assert_eq!(results[0].0, a);
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn upsert_replaces_existing_id() {
        let mut store = InMemoryVectorStore::new();
        let id = ChunkId::new();
        store.upsert(id, vec![1.0, 0.0]);
        store.upsert(id, vec![0.0, 1.0]);
        assert_eq!(store.len(), 1);
    }
}
