//! Embedding trait

use crate::Result;

/// Text embedding model
///
/// Implementations:
/// - `HashingEmbedder` - deterministic, model-free
/// - `OnnxEmbedder` - sentence-transformer via ONNX Runtime
pub trait Embedder: Send + Sync {
    /// Embed `texts`, one unit-normalized vector per input, order preserved
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| crate::Error::Embedding("embedder returned no vector".into()))
    }

    /// Output dimension
    fn dim(&self) -> usize;
}
