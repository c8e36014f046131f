//! Core traits for the grounded question-answering pipeline
//!
//! Every external collaborator of the core sits behind one of these traits so
//! backends can be swapped and tests can use stubs.
//!
//! # Trait Hierarchy
//!
//! ```text
//! Retrieval:
//!   - DenseIndex: nearest neighbours of a query embedding
//!   - LexicalIndex: per-chunk lexical relevance of query tokens
//!   - Embedder: text → unit-normalized vectors
//!   - CrossEncoder: (query, passage) → relevance
//!
//! Generation:
//!   - Generator: prompt → text, with a typed failure
//!
//! Guardrails:
//!   - QuerySafety: reject restricted topics before retrieval
//!   - PiiRedactor: scrub personal data from text
//!   - AnswerValidator: sanity-check an answer against its sources
//! ```

mod embedding;
mod guardrails;
mod index;
mod llm;
mod rerank;

pub use embedding::Embedder;
pub use guardrails::{AnswerValidator, PiiRedactor, QuerySafety, SafetyVerdict, ValidationVerdict};
pub use index::{DenseIndex, LexicalIndex};
pub use llm::{GenerationRequest, Generator};
pub use rerank::CrossEncoder;
