//! Flat inner-product vector index
//!
//! Exhaustive search over unit-normalized embeddings, so inner product equals
//! cosine similarity. Row `i` belongs to chunk id `i`.

use std::path::Path;

use grounded_qa_core::{ChunkId, DenseIndex};
use serde::{Deserialize, Serialize};

use crate::RagError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlatVectorIndex {
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatVectorIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
        }
    }

    /// Build from row vectors; every row must have the same dimension
    pub fn from_vectors(vectors: Vec<Vec<f32>>) -> Result<Self, RagError> {
        let dim = vectors.first().map(Vec::len).unwrap_or(0);
        let mut index = Self::new(dim);
        for vector in vectors {
            index.add(vector)?;
        }
        Ok(index)
    }

    /// Append a vector, returning its chunk id
    pub fn add(&mut self, vector: Vec<f32>) -> Result<ChunkId, RagError> {
        if vector.len() != self.dim {
            return Err(RagError::Index(format!(
                "dimension mismatch: expected {}, got {}",
                self.dim,
                vector.len()
            )));
        }
        self.vectors.push(vector);
        Ok(self.vectors.len() - 1)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RagError> {
        let file = std::fs::File::open(path.as_ref())?;
        let index: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        if index.vectors.iter().any(|v| v.len() != index.dim) {
            return Err(RagError::Index(format!(
                "{}: rows disagree with declared dimension {}",
                path.as_ref().display(),
                index.dim
            )));
        }
        Ok(index)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RagError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

impl DenseIndex for FlatVectorIndex {
    fn nearest(&self, query: &[f32], k: usize) -> grounded_qa_core::Result<Vec<(ChunkId, f32)>> {
        if query.len() != self.dim {
            return Err(RagError::Index(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dim
            ))
            .into());
        }

        let mut scored: Vec<(ChunkId, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, v)| (id, v.iter().zip(query).map(|(a, b)| a * b).sum()))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        Ok(scored)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}
