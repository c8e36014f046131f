//! Generation service integration
//!
//! Features:
//! - Ollama backend implementing the core `Generator` trait, with retries
//! - Citation-constrained prompt construction and output budgeting
//! - Follow-up and per-source rationale prompts

pub mod backend;
pub mod prompt;

pub use backend::{LlmConfig, OllamaBackend};
pub use prompt::{
    count_prompt_tokens, followup_prompt, generation_request, output_budget, rationale_prompt,
    GroundedPromptBuilder,
};

use grounded_qa_core::GenerationError;
use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0}s")]
    Timeout(u64),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Malformed prompt: {0}")]
    MalformedPrompt(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Transient failures worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Network(_) | LlmError::Timeout(_) => true,
            LlmError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Network(msg) => GenerationError::ServiceUnavailable(msg),
            LlmError::Api { status, message } if status >= 500 => {
                GenerationError::ServiceUnavailable(format!("status {status}: {message}"))
            }
            LlmError::Api { status, message } => {
                GenerationError::Model(format!("status {status}: {message}"))
            }
            LlmError::Timeout(secs) => GenerationError::Timeout(secs),
            LlmError::ModelNotFound(model) => {
                GenerationError::Model(format!("model not found: {model}"))
            }
            LlmError::MalformedPrompt(msg) => GenerationError::MalformedPrompt(msg),
            LlmError::InvalidResponse(msg) => GenerationError::InvalidResponse(msg),
            LlmError::Configuration(msg) => GenerationError::ServiceUnavailable(msg),
        }
    }
}

impl From<LlmError> for grounded_qa_core::Error {
    fn from(err: LlmError) -> Self {
        grounded_qa_core::Error::Generation(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err: GenerationError = LlmError::Network("connection refused".into()).into();
        assert!(matches!(err, GenerationError::ServiceUnavailable(_)));

        let err: GenerationError = LlmError::Timeout(60).into();
        assert_eq!(err, GenerationError::Timeout(60));

        let err: GenerationError = LlmError::Api {
            status: 503,
            message: "overloaded".into(),
        }
        .into();
        assert!(err.is_retryable());

        let err: GenerationError = LlmError::ModelNotFound("llama".into()).into();
        assert!(matches!(err, GenerationError::Model(_)));
    }

    #[test]
    fn test_retryable() {
        assert!(LlmError::Network("x".into()).is_retryable());
        assert!(LlmError::Api { status: 502, message: String::new() }.is_retryable());
        assert!(!LlmError::Api { status: 400, message: String::new() }.is_retryable());
        assert!(!LlmError::MalformedPrompt("empty".into()).is_retryable());
    }
}
