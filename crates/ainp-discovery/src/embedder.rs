//! `embed(text) -> f32[D]` as a collaborator boundary.
//!
//! The embedding model itself is out of core (spec.md §1 Non-goals): this
//! module only fixes the trait shape a production RPC collaborator would
//! implement, plus a deterministic, dependency-free fallback used by tests
//! and local/dev runs so `advertise` never has to special-case a missing
//! embedding.

use ainp_core::constants::EMBEDDING_DIM;

/// A pluggable source of capability embeddings. Never "the embedding model"
/// in code — just the seam an external RPC collaborator plugs into.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Vec<f32>;

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Deterministic hash-based embedding: each dimension is derived from a
/// keyed blake3 hash of `(text, dimension index)`, mapped into `[-1, 1]`.
/// Not semantically meaningful — only stable and collision-resistant enough
/// for tests and local/dev runs where no real embedding RPC is configured.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        HashEmbedder { dim }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        HashEmbedder::new(EMBEDDING_DIM)
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        (0..self.dim)
            .map(|i| {
                let hash = blake3::hash(format!("{i}:{text}").as_bytes());
                let byte = hash.as_bytes()[0];
                (byte as f32 / 255.0) * 2.0 - 1.0
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}
