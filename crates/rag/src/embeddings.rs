//! Text Embeddings
//!
//! Generates dense, unit-normalized embeddings for queries and sentence spans.

#[cfg(feature = "onnx")]
use std::path::Path;

#[cfg(feature = "onnx")]
use ndarray::Array2;
#[cfg(feature = "onnx")]
use ort::{session::builder::GraphOptimizationLevel, session::Session, value::Tensor};
#[cfg(feature = "onnx")]
use parking_lot::Mutex;
#[cfg(feature = "onnx")]
use tokenizers::Tokenizer;

use grounded_qa_core::Embedder;
use unicode_segmentation::UnicodeSegmentation;

#[cfg(feature = "onnx")]
use crate::RagError;

/// Embedding configuration
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Maximum sequence length
    pub max_seq_len: usize,
    /// Embedding dimension
    pub embedding_dim: usize,
    /// Normalize embeddings
    pub normalize: bool,
    /// Batch size for bulk embedding
    pub batch_size: usize,
    /// ONNX output tensor holding token embeddings
    pub output_name: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            max_seq_len: 256,
            // all-MiniLM-L6-v2
            embedding_dim: 384,
            normalize: true,
            batch_size: 32,
            output_name: "last_hidden_state".to_string(),
        }
    }
}

/// Cosine similarity; 0 when either vector is zero or lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Model-free embedder: lowercase words hashed into a fixed number of buckets
///
/// Texts sharing vocabulary get a positive cosine similarity, which is enough
/// for offline operation and deterministic tests.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    config: EmbeddingConfig,
}

impl HashingEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }

    pub fn with_dim(dim: usize) -> Self {
        Self::new(EmbeddingConfig {
            embedding_dim: dim.max(1),
            ..Default::default()
        })
    }

    /// Embed a single text
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let dim = self.config.embedding_dim.max(1);
        let mut embedding = vec![0.0f32; dim];

        for word in text.unicode_words() {
            let bucket = (fnv1a(&word.to_lowercase()) % dim as u64) as usize;
            embedding[bucket] += 1.0;
        }

        if self.config.normalize {
            l2_normalize(&mut embedding);
        }
        embedding
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(EmbeddingConfig::default())
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, texts: &[&str]) -> grounded_qa_core::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dim(&self) -> usize {
        self.config.embedding_dim.max(1)
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in s.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Sentence-transformer embedder running on ONNX Runtime
///
/// Mean-pools the token embeddings under the attention mask, then
/// L2-normalizes.
#[cfg(feature = "onnx")]
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    config: EmbeddingConfig,
}

#[cfg(feature = "onnx")]
impl OnnxEmbedder {
    pub fn new(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        config: EmbeddingConfig,
    ) -> Result<Self, RagError> {
        let session = Session::builder()
            .map_err(|e| RagError::Model(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| RagError::Model(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e| RagError::Model(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| RagError::Model(e.to_string()))?;

        let tokenizer =
            Tokenizer::from_file(tokenizer_path).map_err(|e| RagError::Model(e.to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            config,
        })
    }

    /// Load `model.onnx` and `tokenizer.json` from a model directory
    pub fn from_dir(dir: impl AsRef<Path>, config: EmbeddingConfig) -> Result<Self, RagError> {
        let dir = dir.as_ref();
        Self::new(dir.join("model.onnx"), dir.join("tokenizer.json"), config)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RagError> {
        let batch_size = texts.len();
        let seq_len = self.config.max_seq_len;

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut token_type_ids = vec![0i64; batch_size * seq_len];
        let mut lengths = Vec::with_capacity(batch_size);

        for (i, encoding) in encodings.iter().enumerate() {
            let len = encoding.get_ids().len().min(seq_len);
            let offset = i * seq_len;
            for j in 0..len {
                input_ids[offset + j] = encoding.get_ids()[j] as i64;
                attention_mask[offset + j] = encoding.get_attention_mask()[j] as i64;
                token_type_ids[offset + j] = encoding.get_type_ids()[j] as i64;
            }
            lengths.push(len);
        }

        let shape = (batch_size, seq_len);
        let to_tensor = |data: Vec<i64>| -> Result<Tensor<i64>, RagError> {
            let array = Array2::from_shape_vec(shape, data)
                .map_err(|e| RagError::Embedding(e.to_string()))?;
            Tensor::from_array(array).map_err(|e| RagError::Model(e.to_string()))
        };
        let input_ids = to_tensor(input_ids)?;
        let attention_mask = to_tensor(attention_mask)?;
        let token_type_ids = to_tensor(token_type_ids)?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids,
            ])
            .map_err(|e| RagError::Model(e.to_string()))?;

        let (shape, hidden) = outputs
            .get(&self.config.output_name)
            .ok_or_else(|| {
                RagError::Model(format!("Missing output tensor: {}", self.config.output_name))
            })?
            .try_extract_tensor::<f32>()
            .map_err(|e| RagError::Model(e.to_string()))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let (out_batch, out_seq, hidden_dim) = match dims.as_slice() {
            [b, s, h] => (*b, *s, *h),
            _ => return Err(RagError::Model(format!("Unexpected tensor shape: {:?}", dims))),
        };
        let dim = self.config.embedding_dim.min(hidden_dim);

        let mut embeddings = Vec::with_capacity(batch_size);
        for (i, &len) in lengths.iter().enumerate().take(out_batch) {
            let tokens = len.min(out_seq).max(1);
            let mut embedding = vec![0.0f32; dim];
            for j in 0..tokens {
                let base = i * out_seq * hidden_dim + j * hidden_dim;
                for (k, value) in embedding.iter_mut().enumerate() {
                    *value += hidden.get(base + k).copied().unwrap_or(0.0);
                }
            }
            for value in &mut embedding {
                *value /= tokens as f32;
            }
            if self.config.normalize {
                l2_normalize(&mut embedding);
            }
            embeddings.push(embedding);
        }

        Ok(embeddings)
    }
}

#[cfg(feature = "onnx")]
impl Embedder for OnnxEmbedder {
    fn embed(&self, texts: &[&str]) -> grounded_qa_core::Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            all.extend(self.embed_batch(batch)?);
        }
        Ok(all)
    }

    fn dim(&self) -> usize {
        self.config.embedding_dim
    }
}
