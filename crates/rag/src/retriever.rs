//! Hybrid Retriever
//!
//! Fuses dense (embedding) and lexical (BM25) signals linearly, optionally
//! reranks the fused pool with a cross-encoder, and can explain each result.

use std::collections::HashMap;
use std::sync::Arc;

use grounded_qa_config::constants::retrieval::{
    DENSE_OVERFETCH, LEXICAL_OVERFETCH, RERANK_WEIGHT,
};
use grounded_qa_config::{RetrievalConfig, Settings};
use grounded_qa_core::{ChunkId, CrossEncoder, Embedder, ScoredChunk};

use crate::{CorpusIndex, Explainer, HashingEmbedder, KeywordCrossEncoder, RagError};

/// Per-query retrieval parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub top_k: usize,
    pub rerank_k: usize,
    /// Dense weight in the fused score
    pub alpha: f32,
    pub explain: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for SearchOptions {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            top_k: config.top_k,
            rerank_k: config.rerank_k,
            alpha: config.hybrid_alpha,
            explain: false,
        }
    }
}

impl SearchOptions {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    /// Repair out-of-range values, returning a warning per repair
    pub fn sanitize(&mut self) -> Vec<String> {
        let defaults = RetrievalConfig::default();
        let mut warnings = Vec::new();

        if !(0.0..=1.0).contains(&self.alpha) {
            warnings.push(format!(
                "alpha must be between 0.0 and 1.0, got {}; using {}",
                self.alpha, defaults.hybrid_alpha
            ));
            self.alpha = defaults.hybrid_alpha;
        }
        if self.top_k == 0 {
            warnings.push(format!("top_k must be at least 1; using {}", defaults.top_k));
            self.top_k = defaults.top_k;
        }
        if self.rerank_k == 0 {
            warnings.push(format!(
                "rerank_k must be at least 1; using {}",
                defaults.rerank_k
            ));
            self.rerank_k = defaults.rerank_k;
        }

        warnings
    }
}

/// Hybrid dense + lexical retriever over a read-only corpus index
pub struct HybridRetriever {
    corpus: Option<CorpusIndex>,
    embedder: Arc<dyn Embedder>,
    reranker: Option<Arc<dyn CrossEncoder>>,
}

impl HybridRetriever {
    /// `None` corpus is valid: every search then returns no results
    ///
    /// A corpus whose dense vectors do not match the embedder's dimension is
    /// dropped with a warning.
    pub fn new(corpus: Option<CorpusIndex>, embedder: Arc<dyn Embedder>) -> Self {
        let corpus = corpus.filter(|c| {
            let index_dim = c.dense().dim();
            let compatible = c.dense().is_empty() || index_dim == embedder.dim();
            if !compatible {
                tracing::warn!(
                    index_dim,
                    embedder_dim = embedder.dim(),
                    "Dense index dimension does not match the embedder, ignoring corpus"
                );
            }
            compatible
        });
        Self {
            corpus,
            embedder,
            reranker: None,
        }
    }

    /// Load the index from `paths.index_dir` and pick backends from
    /// `retrieval`; never fails
    pub fn from_settings(settings: &Settings) -> Self {
        let corpus = CorpusIndex::try_load(&settings.paths.index_dir);
        let embedder = build_embedder(&settings.retrieval);
        let mut retriever = Self::new(corpus, embedder);
        if settings.retrieval.reranking_enabled {
            retriever = retriever.with_reranker(build_reranker(&settings.retrieval));
        }
        retriever
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn CrossEncoder>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Whether a corpus index is loaded
    pub fn is_ready(&self) -> bool {
        self.corpus.is_some()
    }

    pub fn reranking_enabled(&self) -> bool {
        self.reranker.is_some()
    }

    pub fn corpus(&self) -> Option<&CorpusIndex> {
        self.corpus.as_ref()
    }

    pub fn corpus_size(&self) -> usize {
        self.corpus.as_ref().map_or(0, CorpusIndex::len)
    }

    /// Search for chunks relevant to `query`
    ///
    /// Returns at most `top_k` chunks ordered by final score, highest first.
    /// `options` are expected to be sanitized; see [`SearchOptions::sanitize`].
    pub fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let Some(corpus) = self.corpus.as_ref().filter(|c| !c.is_empty()) else {
            tracing::debug!("No corpus index loaded, returning no results");
            return Ok(Vec::new());
        };

        let top_k = options.top_k.max(1);
        let rerank_k = options.rerank_k.max(1);
        let alpha = options.alpha.clamp(0.0, 1.0);
        let reranking = self.reranker.is_some();
        let dense_k = if reranking { DENSE_OVERFETCH * top_k } else { top_k };
        let lexical_k = if reranking {
            LEXICAL_OVERFETCH * rerank_k
        } else {
            rerank_k
        };

        let query_embedding = self.embedder.embed_one(query)?;
        let dense_hits = corpus.dense().nearest(&query_embedding, dense_k)?;

        let tokens: Vec<&str> = query.split_whitespace().collect();
        let sparse_scores = corpus.lexical().score_all(&tokens)?;
        let lexical_hits = top_indices(&sparse_scores, lexical_k);

        // Union of both top sets, dense order first
        let dense_scores: HashMap<ChunkId, f32> = dense_hits.iter().copied().collect();
        let mut candidates: Vec<ChunkId> = dense_hits.iter().map(|(id, _)| *id).collect();
        for (id, _) in &lexical_hits {
            if !dense_scores.contains_key(id) {
                candidates.push(*id);
            }
        }
        let sparse_top: HashMap<ChunkId, f32> = lexical_hits.into_iter().collect();

        let mut results: Vec<ScoredChunk> = candidates
            .into_iter()
            .filter_map(|id| {
                let chunk = corpus.chunk(id)?.clone();
                let dense = dense_scores.get(&id).copied().unwrap_or(0.0);
                let sparse = sparse_top.get(&id).copied().unwrap_or(0.0);
                Some(ScoredChunk::fused(chunk, dense, sparse, alpha))
            })
            .collect();

        let candidate_count = results.len();
        sort_by_final_score(&mut results);
        results.truncate(dense_k);

        let rerank_applied = match &self.reranker {
            Some(reranker) => self.rerank(reranker.as_ref(), query, &mut results),
            None => false,
        };
        results.truncate(top_k);

        if options.explain {
            let explainer = Explainer::new(self.embedder.as_ref(), corpus.lexical());
            let weight = rerank_applied.then_some(RERANK_WEIGHT);
            for hit in &mut results {
                hit.explanation =
                    Some(explainer.explain(query, &query_embedding, hit, alpha, weight));
            }
        }

        tracing::debug!(
            query_len = query.len(),
            top_k,
            alpha,
            candidates = candidate_count,
            reranked = rerank_applied,
            results = results.len(),
            "Hybrid search complete"
        );

        Ok(results)
    }

    /// Blend cross-encoder scores into `final_score` and re-sort
    ///
    /// On cross-encoder failure the fused order is kept.
    fn rerank(&self, reranker: &dyn CrossEncoder, query: &str, results: &mut [ScoredChunk]) -> bool {
        if results.is_empty() {
            return false;
        }

        let pairs: Vec<(&str, &str)> = results
            .iter()
            .map(|r| (query, r.chunk.text.as_str()))
            .collect();
        let scores = match reranker.score_pairs(&pairs) {
            Ok(scores) if scores.len() == results.len() => scores,
            Ok(scores) => {
                tracing::warn!(
                    expected = results.len(),
                    got = scores.len(),
                    reranker = reranker.name(),
                    "Cross-encoder returned wrong number of scores, keeping fused order"
                );
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, reranker = reranker.name(), "Reranking failed, keeping fused order");
                return false;
            }
        };

        for (result, score) in results.iter_mut().zip(scores) {
            result.rerank_score = Some(score);
            result.final_score = RERANK_WEIGHT * score + (1.0 - RERANK_WEIGHT) * result.fused_score;
        }
        sort_by_final_score(results);
        true
    }
}

/// Stable descending sort by final score
fn sort_by_final_score(results: &mut [ScoredChunk]) {
    results.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
}

/// The `k` highest-scoring positions, ties broken by position
fn top_indices(scores: &[f32], k: usize) -> Vec<(ChunkId, f32)> {
    let mut indexed: Vec<(ChunkId, f32)> = scores.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
    indexed.truncate(k);
    indexed
}

fn build_embedder(config: &RetrievalConfig) -> Arc<dyn Embedder> {
    #[cfg(feature = "onnx")]
    if let Some(dir) = &config.embedding_model_path {
        let embedding_config = crate::EmbeddingConfig {
            embedding_dim: config.embedding_dim,
            ..Default::default()
        };
        match crate::OnnxEmbedder::from_dir(dir, embedding_config) {
            Ok(embedder) => return Arc::new(embedder),
            Err(e) => {
                tracing::warn!(path = %dir, error = %e, "Failed to load ONNX embedder, using hashed embeddings")
            }
        }
    }
    #[cfg(not(feature = "onnx"))]
    if config.embedding_model_path.is_some() {
        tracing::warn!("Embedding model configured but the onnx feature is disabled, using hashed embeddings");
    }

    Arc::new(HashingEmbedder::with_dim(config.embedding_dim))
}

fn build_reranker(config: &RetrievalConfig) -> Arc<dyn CrossEncoder> {
    #[cfg(feature = "onnx")]
    if let Some(dir) = &config.reranker_model_path {
        match crate::OnnxCrossEncoder::from_dir(dir, crate::RerankerConfig::default()) {
            Ok(encoder) => return Arc::new(encoder),
            Err(e) => {
                tracing::warn!(path = %dir, error = %e, "Failed to load ONNX cross-encoder, using keyword scoring")
            }
        }
    }
    #[cfg(not(feature = "onnx"))]
    if config.reranker_model_path.is_some() {
        tracing::warn!("Reranker model configured but the onnx feature is disabled, using keyword scoring");
    }

    Arc::new(KeywordCrossEncoder::new())
}
