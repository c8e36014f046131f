//! Error types shared across the workspace

use thiserror::Error;

/// Workspace-wide error
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Reranker error: {0}")]
    Reranker(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Guardrail error: {0}")]
    Guardrail(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Typed failure reason of a generation call
///
/// The grounding engine never lets one of these escape a query; it is
/// rendered into the degraded answer text instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("generation service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("malformed prompt: {0}")]
    MalformedPrompt(String),

    #[error("generation timed out after {0}s")]
    Timeout(u64),

    #[error("model error: {0}")]
    Model(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_) | Self::Timeout(_))
    }
}
