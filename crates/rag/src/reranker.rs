//! Cross-encoder reranking
//!
//! Two backends implement [`CrossEncoder`]:
//! - `OnnxCrossEncoder` (feature `onnx`): a sequence-classification model
//!   scoring each (query, passage) pair jointly
//! - [`KeywordCrossEncoder`]: TF-IDF-like keyword overlap, used when no
//!   model is configured

#[cfg(feature = "onnx")]
use ndarray::Array2;
#[cfg(feature = "onnx")]
use ort::{session::builder::GraphOptimizationLevel, session::Session, value::Tensor};
#[cfg(feature = "onnx")]
use std::path::Path;
#[cfg(feature = "onnx")]
use tokenizers::Tokenizer;

use grounded_qa_core::CrossEncoder;
use parking_lot::Mutex;
use std::collections::HashSet;

#[cfg(feature = "onnx")]
use crate::RagError;

#[derive(Debug, Clone)]
pub struct RerankerConfig {
    /// Maximum tokens per (query, passage) pair
    pub max_seq_len: usize,
    /// Name of the logits output
    pub output_name: String,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            max_seq_len: 512,
            output_name: "logits".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RerankerStats {
    pub total_calls: usize,
    pub total_pairs: usize,
}

/// Keyword-overlap scorer with sqrt term frequency and a length-based idf
/// approximation, squashed into [0, 1)
pub struct KeywordCrossEncoder {
    stats: Mutex<RerankerStats>,
}

impl KeywordCrossEncoder {
    const STOPWORDS: &'static [&'static str] = &[
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has",
        "had", "do", "does", "did", "will", "would", "could", "should", "may", "might", "must",
        "shall", "can", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as", "into",
        "through", "and", "or", "but", "if", "then", "so", "what", "which", "who", "how", "i",
        "me", "my", "we", "our", "you", "your", "it", "its", "this", "that", "these", "those",
    ];

    pub fn new() -> Self {
        Self {
            stats: Mutex::new(RerankerStats::default()),
        }
    }

    pub fn score(query: &str, passage: &str) -> f32 {
        let stopwords: HashSet<&str> = Self::STOPWORDS.iter().copied().collect();
        let clean = |w: &str| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        };

        let query_terms: Vec<String> = query
            .split_whitespace()
            .map(clean)
            .filter(|w| w.chars().count() > 1 && !stopwords.contains(w.as_str()))
            .collect();
        if query_terms.is_empty() {
            return 0.0;
        }

        let doc_words: Vec<String> = passage.split_whitespace().map(clean).collect();
        let doc_len = doc_words.len().max(1) as f32;
        let length_norm = 1.0 / (1.0 + (doc_len / 50.0).sqrt());

        let mut total = 0.0f32;
        let mut matched = 0usize;
        for (pos, term) in query_terms.iter().enumerate() {
            let tf = doc_words.iter().filter(|w| *w == term).count() as f32;
            if tf == 0.0 {
                continue;
            }
            matched += 1;
            let idf_approx = (1.0 + term.chars().count() as f32).ln();
            let position_weight = 1.0 / (1.0 + pos as f32 * 0.1);
            total += tf.sqrt() * idf_approx * position_weight * length_norm;
        }

        let coverage = matched as f32 / query_terms.len() as f32;
        let raw = total + coverage * 0.3;
        raw / (raw + 1.0)
    }

    pub fn stats(&self) -> RerankerStats {
        self.stats.lock().clone()
    }
}

impl Default for KeywordCrossEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossEncoder for KeywordCrossEncoder {
    fn score_pairs(&self, pairs: &[(&str, &str)]) -> grounded_qa_core::Result<Vec<f32>> {
        {
            let mut stats = self.stats.lock();
            stats.total_calls += 1;
            stats.total_pairs += pairs.len();
        }
        Ok(pairs.iter().map(|(q, p)| Self::score(q, p)).collect())
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Cross-encoder running on ONNX Runtime
#[cfg(feature = "onnx")]
pub struct OnnxCrossEncoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    config: RerankerConfig,
    stats: Mutex<RerankerStats>,
}

#[cfg(feature = "onnx")]
impl OnnxCrossEncoder {
    pub fn new(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        config: RerankerConfig,
    ) -> Result<Self, RagError> {
        let session = Session::builder()
            .map_err(|e| RagError::Model(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| RagError::Model(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| RagError::Model(e.to_string()))?;

        let tokenizer =
            Tokenizer::from_file(tokenizer_path).map_err(|e| RagError::Model(e.to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            config,
            stats: Mutex::new(RerankerStats::default()),
        })
    }

    /// Load `model.onnx` and `tokenizer.json` from a model directory
    pub fn from_dir(dir: impl AsRef<Path>, config: RerankerConfig) -> Result<Self, RagError> {
        let dir = dir.as_ref();
        Self::new(dir.join("model.onnx"), dir.join("tokenizer.json"), config)
    }

    fn score_pair(&self, query: &str, passage: &str) -> Result<f32, RagError> {
        let encoding = self
            .tokenizer
            .encode((query, passage), true)
            .map_err(|e| RagError::Reranker(e.to_string()))?;

        let seq_len = self.config.max_seq_len;
        let len = encoding.get_ids().len().min(seq_len);
        let mut ids = vec![0i64; seq_len];
        let mut mask = vec![0i64; seq_len];
        for j in 0..len {
            ids[j] = encoding.get_ids()[j] as i64;
            mask[j] = 1;
        }

        let ids = Array2::from_shape_vec((1, seq_len), ids)
            .map_err(|e| RagError::Reranker(e.to_string()))?;
        let mask = Array2::from_shape_vec((1, seq_len), mask)
            .map_err(|e| RagError::Reranker(e.to_string()))?;
        let ids = Tensor::from_array(ids).map_err(|e| RagError::Model(e.to_string()))?;
        let mask = Tensor::from_array(mask).map_err(|e| RagError::Model(e.to_string()))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![
                "input_ids" => ids,
                "attention_mask" => mask,
            ])
            .map_err(|e| RagError::Model(e.to_string()))?;

        let (_, logits) = outputs
            .get(&self.config.output_name)
            .ok_or_else(|| RagError::Model("Missing logits output".to_string()))?
            .try_extract_tensor::<f32>()
            .map_err(|e| RagError::Model(e.to_string()))?;

        Ok(relevance(logits))
    }
}

/// Softmax probability of the "relevant" class, or sigmoid of a single logit
#[cfg(feature = "onnx")]
fn relevance(logits: &[f32]) -> f32 {
    match logits {
        [] => 0.0,
        [single] => 1.0 / (1.0 + (-single).exp()),
        many => {
            let max = many.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            let exp_sum: f32 = many.iter().map(|&x| (x - max).exp()).sum();
            (many[1] - max).exp() / exp_sum
        }
    }
}

#[cfg(feature = "onnx")]
impl CrossEncoder for OnnxCrossEncoder {
    fn score_pairs(&self, pairs: &[(&str, &str)]) -> grounded_qa_core::Result<Vec<f32>> {
        {
            let mut stats = self.stats.lock();
            stats.total_calls += 1;
            stats.total_pairs += pairs.len();
        }
        pairs
            .iter()
            .map(|(q, p)| self.score_pair(q, p).map_err(Into::into))
            .collect()
    }

    fn name(&self) -> &str {
        "onnx-cross-encoder"
    }
}
