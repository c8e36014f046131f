//! Ranking explanations
//!
//! For a retrieved chunk: which of its sentences best match the query, which
//! query terms carried the lexical match, and how the final score was formed.

use grounded_qa_config::constants::explain::{MAX_SENTENCES, TOP_SPANS, TOP_TERMS};
use grounded_qa_core::{
    split_spans, Embedder, Explanation, FusionBreakdown, LexicalIndex, RerankBreakdown,
    ScoredChunk, SpanMatch, TermContribution,
};

use crate::embeddings::cosine_similarity;
use crate::sparse_search::{normalize_term, tokenize};

pub struct Explainer<'a> {
    embedder: &'a dyn Embedder,
    lexical: &'a dyn LexicalIndex,
}

impl<'a> Explainer<'a> {
    pub fn new(embedder: &'a dyn Embedder, lexical: &'a dyn LexicalIndex) -> Self {
        Self { embedder, lexical }
    }

    /// Explain one hit; `rerank_weight` is `Some` when reranking was applied
    pub fn explain(
        &self,
        query: &str,
        query_embedding: &[f32],
        hit: &ScoredChunk,
        alpha: f32,
        rerank_weight: Option<f32>,
    ) -> Explanation {
        Explanation {
            top_spans: self.top_spans(query_embedding, &hit.chunk.text),
            term_contributions: self.term_contributions(query, &hit.chunk.text),
            fusion_breakdown: FusionBreakdown {
                dense: hit.dense_score,
                sparse: hit.sparse_score,
                fused: hit.fused_score,
                alpha,
            },
            rerank_breakdown: match (hit.rerank_score, rerank_weight) {
                (Some(score), Some(weight)) => RerankBreakdown {
                    applied: true,
                    score: Some(score),
                    weight: Some(weight),
                },
                _ => RerankBreakdown::not_applied(),
            },
            llm_reasoning: None,
        }
    }

    fn top_spans(&self, query_embedding: &[f32], text: &str) -> Vec<SpanMatch> {
        let sentences: Vec<String> = split_spans(text).into_iter().take(MAX_SENTENCES).collect();
        if sentences.is_empty() {
            return Vec::new();
        }

        let refs: Vec<&str> = sentences.iter().map(String::as_str).collect();
        let embeddings = match self.embedder.embed(&refs) {
            Ok(embeddings) => embeddings,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to embed sentences for explanation");
                return Vec::new();
            }
        };

        let mut spans: Vec<SpanMatch> = sentences
            .into_iter()
            .zip(embeddings)
            .map(|(sentence, embedding)| SpanMatch {
                similarity: cosine_similarity(query_embedding, &embedding),
                sentence,
            })
            .collect();
        spans.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        spans.truncate(TOP_SPANS);
        spans
    }

    fn term_contributions(&self, query: &str, text: &str) -> Vec<TermContribution> {
        let chunk_terms = tokenize(text);

        let mut seen = Vec::new();
        let mut contributions: Vec<TermContribution> = query
            .split_whitespace()
            .map(normalize_term)
            .filter(|t| !t.is_empty())
            .filter(|t| {
                if seen.contains(t) {
                    false
                } else {
                    seen.push(t.clone());
                    true
                }
            })
            .filter_map(|term| {
                let tf = chunk_terms.iter().filter(|c| **c == term).count() as u32;
                if tf == 0 {
                    return None;
                }
                let idf = self.lexical.idf(&term);
                Some(TermContribution {
                    weight: tf as f32 * idf,
                    term,
                    tf,
                    idf,
                })
            })
            .collect();

        contributions.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        contributions.truncate(TOP_TERMS);
        contributions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bm25Index, HashingEmbedder};
    use grounded_qa_core::Chunk;

    fn texts() -> Vec<&'static str> {
        vec![
            "The Eiffel Tower is in Paris. It was completed in 1889.\nTourists visit daily.",
            "Berlin is the capital of Germany.",
            "Rome has the Colosseum.",
        ]
    }

    #[test]
    fn test_explanation_contents() {
        let embedder = HashingEmbedder::default();
        let lexical = Bm25Index::from_texts(&texts());
        let explainer = Explainer::new(&embedder, &lexical);

        let query = "When was the Eiffel Tower completed?";
        let query_embedding = embedder.embed_text(query);
        let hit = ScoredChunk::fused(Chunk::new(0, "paris.txt", texts()[0]), 0.7, 2.0, 0.65);

        let explanation = explainer.explain(query, &query_embedding, &hit, 0.65, None);

        assert_eq!(explanation.top_spans.len(), 2);
        assert!(explanation.top_spans[0].similarity >= explanation.top_spans[1].similarity);
        assert!(explanation.top_spans[0].sentence.contains("completed")
            || explanation.top_spans[0].sentence.contains("Eiffel"));

        assert!(explanation.term_contributions.len() <= 3);
        assert!(explanation
            .term_contributions
            .iter()
            .any(|t| t.term == "eiffel" && t.tf == 1));
        for pair in explanation.term_contributions.windows(2) {
            assert!(pair[0].weight >= pair[1].weight);
        }

        assert_eq!(explanation.fusion_breakdown.alpha, 0.65);
        assert_eq!(explanation.fusion_breakdown.fused, hit.fused_score);
        assert!(!explanation.rerank_breakdown.applied);
        assert!(explanation.llm_reasoning.is_none());
    }

    #[test]
    fn test_rerank_breakdown_when_applied() {
        let embedder = HashingEmbedder::default();
        let lexical = Bm25Index::from_texts(&texts());
        let explainer = Explainer::new(&embedder, &lexical);

        let mut hit = ScoredChunk::fused(Chunk::new(1, "de.txt", texts()[1]), 0.5, 0.5, 0.5);
        hit.rerank_score = Some(0.9);
        let explanation = explainer.explain("Berlin", &embedder.embed_text("Berlin"), &hit, 0.5, Some(0.7));

        assert!(explanation.rerank_breakdown.applied);
        assert_eq!(explanation.rerank_breakdown.score, Some(0.9));
        assert_eq!(explanation.rerank_breakdown.weight, Some(0.7));
    }

    #[test]
    fn test_sentence_cap() {
        let embedder = HashingEmbedder::default();
        let long_text: String = (0..30).map(|i| format!("Sentence number {i}. ")).collect();
        let lexical = Bm25Index::from_texts(&[long_text.as_str()]);
        let explainer = Explainer::new(&embedder, &lexical);
        let hit = ScoredChunk::fused(Chunk::new(0, "long.txt", long_text.clone()), 0.1, 0.1, 0.5);

        let explanation = explainer.explain("number", &embedder.embed_text("number"), &hit, 0.5, None);
        assert_eq!(explanation.top_spans.len(), 2);
    }
}
