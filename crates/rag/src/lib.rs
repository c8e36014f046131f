//! Hybrid retrieval over a pre-built corpus index
//!
//! Features:
//! - Dense search over a flat inner-product vector index
//! - Lexical search via in-memory BM25 Okapi or a Tantivy index
//! - Linear score fusion with a configurable dense weight
//! - Optional cross-encoder reranking (ONNX or keyword fallback)
//! - Per-result ranking explanations (best spans, term weights, score breakdown)
//! - Offline retrieval evaluation (Recall@k, MRR)

pub mod corpus;
pub mod embeddings;
pub mod eval;
pub mod explain;
pub mod reranker;
pub mod retriever;
pub mod sparse_search;
pub mod tantivy_index;
pub mod vector_store;

pub use corpus::CorpusIndex;
pub use embeddings::{cosine_similarity, EmbeddingConfig, HashingEmbedder};
#[cfg(feature = "onnx")]
pub use embeddings::OnnxEmbedder;
pub use eval::{evaluate, EvalQuery, EvalReport, ModeMetrics, RetrievalMode};
pub use explain::Explainer;
pub use reranker::{KeywordCrossEncoder, RerankerConfig, RerankerStats};
#[cfg(feature = "onnx")]
pub use reranker::OnnxCrossEncoder;
pub use retriever::{HybridRetriever, SearchOptions};
pub use sparse_search::Bm25Index;
pub use tantivy_index::TantivyLexicalIndex;
pub use vector_store::FlatVectorIndex;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Reranker error: {0}")]
    Reranker(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<RagError> for grounded_qa_core::Error {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Embedding(msg) => grounded_qa_core::Error::Embedding(msg),
            RagError::Reranker(msg) => grounded_qa_core::Error::Reranker(msg),
            RagError::Index(msg) | RagError::NotFound(msg) => grounded_qa_core::Error::Index(msg),
            RagError::Model(msg) => grounded_qa_core::Error::Retrieval(msg),
            RagError::Io(e) => grounded_qa_core::Error::Io(e),
            RagError::Serialization(e) => grounded_qa_core::Error::Serialization(e),
        }
    }
}

impl From<grounded_qa_core::Error> for RagError {
    fn from(err: grounded_qa_core::Error) -> Self {
        match err {
            grounded_qa_core::Error::Embedding(msg) => RagError::Embedding(msg),
            grounded_qa_core::Error::Reranker(msg) => RagError::Reranker(msg),
            grounded_qa_core::Error::Index(msg) => RagError::Index(msg),
            grounded_qa_core::Error::Io(e) => RagError::Io(e),
            grounded_qa_core::Error::Serialization(e) => RagError::Serialization(e),
            other => RagError::Index(other.to_string()),
        }
    }
}
