//! Embedding provider seam.
//!
//! The embedding model runtime is an external, black-box collaborator
//! (spec §1): "a black-box provider returning vectors". This module defines
//! the trait that seam implements plus a default, `fastembed`-backed
//! implementation matching the teacher's `semantic/pool.rs` model, so the
//! pipeline has a concrete local provider to run against out of the box.

use crate::error::CoreError;

pub trait EmbeddingProvider: Send + Sync {
    fn dimensions(&self) -> usize;

    /// Embeds a batch of texts, returning one vector per input in order.
    /// Spec §4.C8: batches are 32-100 chunks; callers are responsible for
    /// respecting `ProviderTimeout`/`ProviderFailure` semantics (spec §7).
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError>;
}

/// `fastembed`-backed provider (teacher: `src/semantic/pool.rs`,
/// `EmbeddingPool`). Lazily initializes a single `TextEmbedding` instance;
/// production deployments would pool several for parallel batches the way
/// the teacher does.
pub struct FastEmbedProvider {
    inner: std::sync::Mutex<fastembed::TextEmbedding>,
    dims: usize,
}

impl FastEmbedProvider {
    pub fn try_new() -> Result<Self, CoreError> {
        let init_options = fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2);
        let model = fastembed::TextEmbedding::try_new(init_options).map_err(|e| CoreError::ProviderFailure {
            component: "embedding".into(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            inner: std::sync::Mutex::new(model),
            dims: 384,
        })
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn dimensions(&self) -> usize {
        self.dims
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        let mut model = self.inner.lock().map_err(|_| CoreError::Internal("embedding provider mutex poisoned".into()))?;
        model.embed(texts.to_vec(), None).map_err(|e| CoreError::ProviderFailure {
            component: "embedding".into(),
            reason: e.to_string(),
        })
    }
}

/// Deterministic hashing-based provider used in tests and as a dependency-
/// free fallback when `skip_embedding` is not set but no real provider is
/// configured. Not semantically meaningful, only dimensionally consistent.
pub struct HashingProvider {
    dims: usize,
}

impl HashingProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl EmbeddingProvider for HashingProvider {
    fn dimensions(&self) -> usize {
        self.dims
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        Ok(texts.iter().map(|t| hash_embed(t, self.dims)).collect())
    }
}

fn hash_embed(text: &str, dims: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut vec = vec![0f32; dims];
    for (i, token) in text.split_whitespace().enumerate() {
        let mut hasher = DefaultHasher::new();
        token.to_lowercase().hash(&mut hasher);
        let h = hasher.finish();
        let idx = (h as usize) % dims;
        vec[idx] += 1.0 / (1.0 + i as f32 * 0.01);
    }
    let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vec {
            *v /= norm;
        }
    }
    vec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_provider_is_deterministic() {
        let provider = HashingProvider::new(32);
        let a = provider.embed_batch(&["fn foo bar".to_string()]).unwrap();
        let b = provider.embed_batch(&["fn foo bar".to_string()]).unwrap();
        assert_eq!(a, b);
    }
}
