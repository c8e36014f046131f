//! Retrieval and generation-model configuration

use serde::{Deserialize, Serialize};

use crate::constants::{model, retrieval};
use crate::ConfigWarning;

/// Hybrid retrieval settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of sources returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Number of lexical candidates (doubled when reranking)
    #[serde(default = "default_rerank_k")]
    pub rerank_k: usize,

    /// Weight for dense vs sparse (0.0 = all lexical, 1.0 = all dense)
    #[serde(default = "default_hybrid_alpha")]
    pub hybrid_alpha: f32,

    /// Re-score candidates with the cross-encoder
    #[serde(default)]
    pub reranking_enabled: bool,

    /// Path to an ONNX cross-encoder; keyword scoring is used when unset
    #[serde(default)]
    pub reranker_model_path: Option<String>,

    /// Path to an ONNX embedding model; hashed embeddings are used when unset
    #[serde(default)]
    pub embedding_model_path: Option<String>,

    /// Dimension of the hashed fallback embeddings
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
}

fn default_top_k() -> usize {
    retrieval::DEFAULT_TOP_K
}

fn default_rerank_k() -> usize {
    retrieval::DEFAULT_RERANK_K
}

fn default_hybrid_alpha() -> f32 {
    retrieval::DEFAULT_HYBRID_ALPHA
}

fn default_embedding_dim() -> usize {
    384
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            rerank_k: default_rerank_k(),
            hybrid_alpha: default_hybrid_alpha(),
            reranking_enabled: false,
            reranker_model_path: None,
            embedding_model_path: None,
            embedding_dim: default_embedding_dim(),
        }
    }
}

impl RetrievalConfig {
    /// Replace out-of-range values with their defaults
    pub fn sanitize(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !(0.0..=1.0).contains(&self.hybrid_alpha) {
            warnings.push(ConfigWarning::new(
                "retrieval.hybrid_alpha",
                format!(
                    "must be between 0.0 and 1.0, got {}; using {}",
                    self.hybrid_alpha,
                    retrieval::DEFAULT_HYBRID_ALPHA
                ),
            ));
            self.hybrid_alpha = retrieval::DEFAULT_HYBRID_ALPHA;
        }
        if self.top_k == 0 {
            warnings.push(ConfigWarning::new(
                "retrieval.top_k",
                format!("must be at least 1; using {}", retrieval::DEFAULT_TOP_K),
            ));
            self.top_k = retrieval::DEFAULT_TOP_K;
        }
        if self.rerank_k == 0 {
            warnings.push(ConfigWarning::new(
                "retrieval.rerank_k",
                format!("must be at least 1; using {}", retrieval::DEFAULT_RERANK_K),
            ));
            self.rerank_k = retrieval::DEFAULT_RERANK_K;
        }
        if self.embedding_dim == 0 {
            warnings.push(ConfigWarning::new(
                "retrieval.embedding_dim",
                "must be at least 1; using 384",
            ));
            self.embedding_dim = default_embedding_dim();
        }

        warnings
    }
}

/// Generation service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Context window of the model, in tokens
    #[serde(default = "default_ctx_tokens")]
    pub ctx_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f32,

    #[serde(default = "default_min_output_tokens")]
    pub min_output_tokens: usize,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: usize,

    /// Tokens kept free between prompt and output
    #[serde(default = "default_safety_margin")]
    pub safety_margin: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_endpoint() -> String {
    model::DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    model::DEFAULT_MODEL.to_string()
}

fn default_ctx_tokens() -> usize {
    model::CTX_TOKENS
}

fn default_temperature() -> f32 {
    model::TEMPERATURE
}

fn default_top_p() -> f32 {
    model::TOP_P
}

fn default_repeat_penalty() -> f32 {
    model::REPEAT_PENALTY
}

fn default_min_output_tokens() -> usize {
    model::MIN_OUTPUT_TOKENS
}

fn default_max_output_tokens() -> usize {
    model::MAX_OUTPUT_TOKENS
}

fn default_safety_margin() -> usize {
    model::SAFETY_MARGIN
}

fn default_timeout_secs() -> u64 {
    model::TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    model::MAX_RETRIES
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            ctx_tokens: default_ctx_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            repeat_penalty: default_repeat_penalty(),
            min_output_tokens: default_min_output_tokens(),
            max_output_tokens: default_max_output_tokens(),
            safety_margin: default_safety_margin(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl ModelConfig {
    /// Replace out-of-range sampling values with their defaults
    pub fn sanitize(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !(0.0..=2.0).contains(&self.temperature) {
            warnings.push(ConfigWarning::new(
                "model.temperature",
                format!(
                    "must be between 0.0 and 2.0, got {}; using {}",
                    self.temperature,
                    model::TEMPERATURE
                ),
            ));
            self.temperature = model::TEMPERATURE;
        }
        if !(0.0..=1.0).contains(&self.top_p) || self.top_p == 0.0 {
            warnings.push(ConfigWarning::new(
                "model.top_p",
                format!(
                    "must be in (0.0, 1.0], got {}; using {}",
                    self.top_p,
                    model::TOP_P
                ),
            ));
            self.top_p = model::TOP_P;
        }
        if self.min_output_tokens > self.max_output_tokens {
            warnings.push(ConfigWarning::new(
                "model.min_output_tokens",
                format!(
                    "{} exceeds max_output_tokens {}; using {}..{}",
                    self.min_output_tokens,
                    self.max_output_tokens,
                    model::MIN_OUTPUT_TOKENS,
                    model::MAX_OUTPUT_TOKENS
                ),
            ));
            self.min_output_tokens = model::MIN_OUTPUT_TOKENS;
            self.max_output_tokens = model::MAX_OUTPUT_TOKENS;
        }

        warnings
    }
}
