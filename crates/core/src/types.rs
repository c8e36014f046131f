//! Corpus and result types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable chunk identifier: position in the persisted chunk sequence
pub type ChunkId = usize;

/// Immutable unit of the corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    /// Source document name
    pub title: String,
}

impl Chunk {
    pub fn new(id: ChunkId, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            title: title.into(),
        }
    }
}

/// A chunk with every retrieval signal attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub dense_score: f32,
    pub sparse_score: f32,
    pub fused_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
    pub final_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
}

impl ScoredChunk {
    /// Fuse the two signals: `alpha * dense + (1 - alpha) * sparse`
    pub fn fused(chunk: Chunk, dense_score: f32, sparse_score: f32, alpha: f32) -> Self {
        let fused_score = alpha * dense_score + (1.0 - alpha) * sparse_score;
        Self {
            chunk,
            dense_score,
            sparse_score,
            fused_score,
            rerank_score: None,
            final_score: fused_score,
            explanation: None,
        }
    }

    pub fn id(&self) -> ChunkId {
        self.chunk.id
    }
}

/// Best-matching sentence of a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanMatch {
    pub sentence: String,
    pub similarity: f32,
}

/// Contribution of a single query term to the lexical match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermContribution {
    pub term: String,
    pub tf: u32,
    pub idf: f32,
    /// tf * idf
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionBreakdown {
    pub dense: f32,
    pub sparse: f32,
    pub fused: f32,
    pub alpha: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankBreakdown {
    pub applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// Weight of the cross-encoder score in the final score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
}

impl RerankBreakdown {
    pub fn not_applied() -> Self {
        Self {
            applied: false,
            score: None,
            weight: None,
        }
    }
}

/// Why a chunk ranked where it did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub top_spans: Vec<SpanMatch>,
    pub term_contributions: Vec<TermContribution>,
    pub fusion_breakdown: FusionBreakdown,
    pub rerank_breakdown: RerankBreakdown,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_reasoning: Option<String>,
}

/// A cited source, resolved against the response's source list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceMapEntry {
    /// 1-based position in [`QueryResult::sources`]
    #[serde(rename = "id")]
    pub source_id: usize,
    pub source_title: String,
    pub span: String,
}

/// One entry of the response's source list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// 1-based, matches the `[Source N]` tag in the prompt
    pub id: usize,
    pub chunk_id: ChunkId,
    pub title: String,
    /// Final retrieval score
    pub score: f32,
    pub text: String,
    pub dense_score: f32,
    pub sparse_score: f32,
    pub fused_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain: Option<Explanation>,
}

impl Source {
    pub fn from_scored(id: usize, scored: ScoredChunk) -> Self {
        Self {
            id,
            chunk_id: scored.chunk.id,
            title: scored.chunk.title,
            score: scored.final_score,
            text: scored.chunk.text,
            dense_score: scored.dense_score,
            sparse_score: scored.sparse_score,
            fused_score: scored.fused_score,
            rerank_score: scored.rerank_score,
            explain: scored.explanation,
        }
    }
}

/// Full outcome of one grounded query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub sources: Vec<Source>,
    pub evidence_map: Vec<EvidenceMapEntry>,
    pub has_external_knowledge: bool,
    pub uncited_warning: bool,
    pub followup_questions: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl QueryResult {
    /// Degraded result returned when answer generation fails
    pub fn generation_failure(reason: impl fmt::Display, warnings: Vec<String>) -> Self {
        Self {
            answer: format!("❌ LLM error: {reason}"),
            warnings,
            ..Self::default()
        }
    }

    /// Whether the answer text is the degraded failure message
    pub fn is_failure(&self) -> bool {
        self.answer.starts_with("❌ LLM error:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GenerationError;

    #[test]
    fn test_fused_score_is_weighted_sum() {
        let scored = ScoredChunk::fused(Chunk::new(0, "a.txt", "text"), 0.8, 0.2, 0.65);
        assert!((scored.fused_score - (0.65 * 0.8 + 0.35 * 0.2)).abs() < 1e-6);
        assert_eq!(scored.final_score, scored.fused_score);
        assert!(scored.rerank_score.is_none());
    }

    #[test]
    fn test_generation_failure_result() {
        let result = QueryResult::generation_failure(
            GenerationError::ServiceUnavailable("down".into()),
            vec![],
        );
        assert_eq!(
            result.answer,
            "❌ LLM error: generation service unavailable: down"
        );
        assert!(result.is_failure());
        assert!(result.sources.is_empty());
        assert!(result.evidence_map.is_empty());
        assert!(!result.has_external_knowledge);
        assert!(!result.uncited_warning);
        assert!(result.followup_questions.is_empty());
    }

    #[test]
    fn test_evidence_entry_serializes_id() {
        let entry = EvidenceMapEntry {
            source_id: 2,
            source_title: "geo.txt".into(),
            span: "Paris".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], 2);
        assert!(json.get("source_id").is_none());
    }

    #[test]
    fn test_source_from_scored() {
        let mut scored = ScoredChunk::fused(Chunk::new(7, "geo.txt", "Paris"), 1.0, 0.5, 0.5);
        scored.rerank_score = Some(0.9);
        scored.final_score = 0.8;
        let source = Source::from_scored(1, scored);
        assert_eq!(source.id, 1);
        assert_eq!(source.chunk_id, 7);
        assert_eq!(source.score, 0.8);
        assert_eq!(source.rerank_score, Some(0.9));
    }
}
