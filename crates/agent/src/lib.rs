//! Grounded question answering
//!
//! Features:
//! - Answer-grounding engine: retrieve, prompt, generate, post-process
//! - Citation evidence maps and uncited-claim warnings
//! - Per-source rationales and follow-up suggestions
//! - Per-session follow-up selection
//! - Guardrail orchestration (topic blocking, PII redaction, validation)

pub mod assistant;
pub mod engine;
pub mod postprocess;
pub mod session;

pub use assistant::{AskOptions, Assistant, Reply};
pub use engine::{AnswerGroundingEngine, QueryOptions, Stage};
pub use postprocess::{postprocess, PostProcessed};
pub use session::{ChatSession, ResolvedInput};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Retrieval task failed: {0}")]
    Join(String),
}

impl From<grounded_qa_rag::RagError> for AgentError {
    fn from(err: grounded_qa_rag::RagError) -> Self {
        AgentError::Retrieval(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AgentError {
    fn from(err: tokio::task::JoinError) -> Self {
        AgentError::Join(err.to_string())
    }
}

impl From<AgentError> for grounded_qa_core::Error {
    fn from(err: AgentError) -> Self {
        grounded_qa_core::Error::Retrieval(err.to_string())
    }
}
