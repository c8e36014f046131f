//! Cross-encoder trait

use crate::Result;

/// Joint (query, passage) relevance model
pub trait CrossEncoder: Send + Sync {
    /// Score each pair; output has the same length and order as `pairs`
    fn score_pairs(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>>;

    fn name(&self) -> &str;
}
