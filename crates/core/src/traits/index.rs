//! Index query contracts
//!
//! Index construction happens elsewhere; the core only reads.

use crate::{ChunkId, Result};

/// Dense (embedding-similarity) index
pub trait DenseIndex: Send + Sync {
    /// The `k` nearest chunks to `query`, most similar first
    fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<(ChunkId, f32)>>;

    /// Vector dimension; queries must match it
    fn dim(&self) -> usize;

    /// Number of indexed vectors
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lexical (term-matching) index
pub trait LexicalIndex: Send + Sync {
    /// Relevance of every chunk to `tokens`, indexed by chunk id
    fn score_all(&self, tokens: &[&str]) -> Result<Vec<f32>>;

    /// Inverse document frequency of a single term, 0 if unknown
    fn idf(&self, term: &str) -> f32;

    /// Number of indexed chunks
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backend name for logging
    fn name(&self) -> &str {
        "lexical"
    }
}
