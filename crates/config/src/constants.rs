//! Centralized defaults
//!
//! Single source of truth for the numbers the retriever, prompt builder and
//! citation analysis agree on.

/// Retrieval defaults
pub mod retrieval {
    pub const DEFAULT_TOP_K: usize = 3;
    pub const DEFAULT_RERANK_K: usize = 3;
    /// Weight of the dense signal in the fused score
    pub const DEFAULT_HYBRID_ALPHA: f32 = 0.65;
    /// Weight of the cross-encoder score in the final score
    pub const RERANK_WEIGHT: f32 = 0.7;
    /// Dense over-fetch factor when reranking
    pub const DENSE_OVERFETCH: usize = 3;
    /// Lexical over-fetch factor when reranking
    pub const LEXICAL_OVERFETCH: usize = 2;
}

/// Ranking explanation limits
pub mod explain {
    pub const MAX_SENTENCES: usize = 12;
    pub const TOP_SPANS: usize = 2;
    pub const TOP_TERMS: usize = 3;
}

/// Generation defaults
pub mod model {
    pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
    pub const DEFAULT_MODEL: &str = "llama3.2:3b";
    pub const CTX_TOKENS: usize = 2048;
    pub const MIN_OUTPUT_TOKENS: usize = 64;
    pub const MAX_OUTPUT_TOKENS: usize = 256;
    pub const SAFETY_MARGIN: usize = 10;
    pub const TEMPERATURE: f32 = 0.2;
    pub const TOP_P: f32 = 0.9;
    pub const REPEAT_PENALTY: f32 = 1.1;
    pub const TIMEOUT_SECS: u64 = 60;
    pub const MAX_RETRIES: u32 = 2;
}

/// Answer grounding defaults
pub mod grounding {
    /// Characters of each chunk placed in the prompt
    pub const EXCERPT_CHARS: usize = 400;
    /// Characters of each chunk placed in an evidence map entry
    pub const EVIDENCE_SPAN_CHARS: usize = 200;
    /// Sentences with at most this many words are not treated as claims
    pub const MIN_CLAIM_WORDS: usize = 6;
    pub const MAX_FOLLOWUPS: usize = 3;
    pub const DEFAULT_STYLE: &str = "auto";
}

/// Guardrail defaults
pub mod guardrails {
    pub const MIN_ANSWER_CHARS: usize = 10;
}

/// Server defaults
pub mod server {
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 8080;
    pub const MAX_SESSIONS: usize = 1000;
    /// Idle time after which a chat session is dropped
    pub const SESSION_TIMEOUT_SECS: u64 = 3600;
    pub const SESSION_CLEANUP_INTERVAL_SECS: u64 = 300;
}
