//! Core traits and types for the grounded question-answering pipeline
//!
//! This crate provides foundational types used across all other crates:
//! - Corpus and result types (chunks, scored chunks, explanations, query results)
//! - Traits for pluggable backends (dense/lexical indexes, embedders,
//!   cross-encoders, generators, guardrails)
//! - Sentence splitting shared by retrieval explanations and citation analysis
//! - Error types

pub mod error;
pub mod sentence;
pub mod traits;
pub mod types;

pub use error::{Error, GenerationError, Result};
pub use sentence::{split_sentences, split_spans, truncate_chars};
pub use types::{
    Chunk, ChunkId, EvidenceMapEntry, Explanation, FusionBreakdown, QueryResult,
    RerankBreakdown, ScoredChunk, Source, SpanMatch, TermContribution,
};

pub use traits::{
    AnswerValidator, CrossEncoder, DenseIndex, Embedder, GenerationRequest, Generator,
    LexicalIndex, PiiRedactor, QuerySafety, SafetyVerdict, ValidationVerdict,
};
