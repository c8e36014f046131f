//! Offline retrieval evaluation
//!
//! Runs the same queries through lexical-only, dense-only and hybrid
//! retrieval and reports Recall@k and MRR for each.

use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;
use std::path::Path;

use grounded_qa_core::{Chunk, ChunkId};
use serde::{Deserialize, Serialize};

use crate::{HybridRetriever, RagError, SearchOptions};

/// Cutoffs reported for recall
pub const EVAL_KS: [usize; 3] = [1, 3, 5];

/// One labelled query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalQuery {
    pub query: String,
    /// Text expected to appear in a relevant chunk
    #[serde(default)]
    pub gold_snippet: Option<String>,
    /// Reference answer, used when no chunk contains the snippet
    #[serde(default)]
    pub answer: Option<String>,
}

impl EvalQuery {
    /// Read one query per non-blank line
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Vec<Self>, RagError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RagError::NotFound(path.display().to_string()));
        }
        let reader = std::io::BufReader::new(std::fs::File::open(path)?);

        let mut queries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            queries.push(serde_json::from_str(&line)?);
        }
        Ok(queries)
    }

    /// Chunks considered relevant: those containing the gold snippet,
    /// else those containing the answer's first word (case-insensitive)
    pub fn gold_ids(&self, chunks: &[Chunk]) -> BTreeSet<ChunkId> {
        let find = |needle: &str| -> BTreeSet<ChunkId> {
            chunks
                .iter()
                .filter(|c| c.text.to_lowercase().contains(needle))
                .map(|c| c.id)
                .collect()
        };

        let snippet = self
            .gold_snippet
            .as_deref()
            .map(str::to_lowercase)
            .filter(|s| !s.is_empty());
        let mut ids = snippet.map(|s| find(&s)).unwrap_or_default();

        if ids.is_empty() {
            if let Some(first) = self
                .answer
                .as_deref()
                .and_then(|a| a.split_whitespace().next())
            {
                ids = find(&first.to_lowercase());
            }
        }
        ids
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// alpha = 0
    Lexical,
    /// alpha = 1
    Dense,
    /// configured alpha
    Hybrid,
}

impl RetrievalMode {
    pub const ALL: [RetrievalMode; 3] = [Self::Lexical, Self::Dense, Self::Hybrid];

    pub fn alpha(&self, hybrid_alpha: f32) -> f32 {
        match self {
            Self::Lexical => 0.0,
            Self::Dense => 1.0,
            Self::Hybrid => hybrid_alpha,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Dense => "dense",
            Self::Hybrid => "hybrid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeMetrics {
    pub mode: RetrievalMode,
    /// Recall@k keyed by k
    pub recall: BTreeMap<usize, f32>,
    pub mrr: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub queries: usize,
    /// Queries for which no gold chunk could be found; they score 0
    pub unlabeled: usize,
    pub modes: Vec<ModeMetrics>,
}

impl EvalReport {
    pub fn mode(&self, mode: RetrievalMode) -> Option<&ModeMetrics> {
        self.modes.iter().find(|m| m.mode == mode)
    }
}

/// 1 if any of the first `k` ids is relevant
pub fn recall_at_k(retrieved: &[ChunkId], gold: &BTreeSet<ChunkId>, k: usize) -> f32 {
    if retrieved.iter().take(k).any(|id| gold.contains(id)) {
        1.0
    } else {
        0.0
    }
}

/// Reciprocal rank of the first relevant id, 0 if none
pub fn reciprocal_rank(retrieved: &[ChunkId], gold: &BTreeSet<ChunkId>) -> f32 {
    retrieved
        .iter()
        .position(|id| gold.contains(id))
        .map_or(0.0, |pos| 1.0 / (pos + 1) as f32)
}

/// Evaluate `queries` against the retriever's corpus in every mode
///
/// Each query retrieves at least as many chunks as the largest cutoff.
pub fn evaluate(
    retriever: &HybridRetriever,
    queries: &[EvalQuery],
    options: &SearchOptions,
) -> Result<EvalReport, RagError> {
    let chunks = retriever
        .corpus()
        .map(|c| c.chunks())
        .ok_or_else(|| RagError::NotFound("corpus index".to_string()))?;

    let max_k = EVAL_KS.iter().copied().max().unwrap_or(1);
    let gold: Vec<BTreeSet<ChunkId>> = queries.iter().map(|q| q.gold_ids(chunks)).collect();
    let unlabeled = gold.iter().filter(|g| g.is_empty()).count();

    let mut modes = Vec::with_capacity(RetrievalMode::ALL.len());
    for mode in RetrievalMode::ALL {
        let mode_options = SearchOptions {
            top_k: options.top_k.max(max_k),
            rerank_k: options.rerank_k,
            alpha: mode.alpha(options.alpha),
            explain: false,
        };

        let mut recall_sums: BTreeMap<usize, f32> = EVAL_KS.iter().map(|k| (*k, 0.0)).collect();
        let mut rr_sum = 0.0f32;
        for (query, gold_ids) in queries.iter().zip(&gold) {
            let ids: Vec<ChunkId> = retriever
                .search(&query.query, &mode_options)?
                .iter()
                .map(|hit| hit.id())
                .collect();
            for (k, sum) in recall_sums.iter_mut() {
                *sum += recall_at_k(&ids, gold_ids, *k);
            }
            rr_sum += reciprocal_rank(&ids, gold_ids);
        }

        let n = queries.len().max(1) as f32;
        let metrics = ModeMetrics {
            mode,
            recall: recall_sums.into_iter().map(|(k, s)| (k, s / n)).collect(),
            mrr: rr_sum / n,
        };
        tracing::info!(
            mode = mode.as_str(),
            mrr = metrics.mrr,
            recall = ?metrics.recall,
            "Retrieval evaluation"
        );
        modes.push(metrics);
    }

    Ok(EvalReport {
        queries: queries.len(),
        unlabeled,
        modes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bm25Index, CorpusIndex, FlatVectorIndex, HashingEmbedder};
    use std::io::Write;
    use std::sync::Arc;

    fn corpus_chunks() -> Vec<Chunk> {
        vec![
            Chunk::new(0, "geo.txt", "Paris is the capital of France."),
            Chunk::new(1, "geo.txt", "Berlin is the capital of Germany."),
            Chunk::new(2, "space.txt", "The Moon orbits the Earth every 27 days."),
        ]
    }

    fn retriever() -> HybridRetriever {
        let chunks = corpus_chunks();
        let embedder = HashingEmbedder::with_dim(128);
        let dense = FlatVectorIndex::from_vectors(
            chunks.iter().map(|c| embedder.embed_text(&c.text)).collect(),
        )
        .unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let lexical = Bm25Index::from_texts(&texts);
        let corpus = CorpusIndex::new(chunks, Box::new(dense), Box::new(lexical)).unwrap();
        HybridRetriever::new(Some(corpus), Arc::new(embedder))
    }

    #[test]
    fn test_metrics() {
        let gold = BTreeSet::from([2]);
        assert_eq!(recall_at_k(&[0, 2, 1], &gold, 1), 0.0);
        assert_eq!(recall_at_k(&[0, 2, 1], &gold, 3), 1.0);
        assert_eq!(reciprocal_rank(&[0, 2, 1], &gold), 0.5);
        assert_eq!(reciprocal_rank(&[0, 1], &gold), 0.0);
    }

    #[test]
    fn test_gold_ids_snippet_then_answer() {
        let chunks = corpus_chunks();
        let by_snippet = EvalQuery {
            query: "q".into(),
            gold_snippet: Some("CAPITAL OF GERMANY".into()),
            answer: None,
        };
        assert_eq!(by_snippet.gold_ids(&chunks), BTreeSet::from([1]));

        let by_answer = EvalQuery {
            query: "q".into(),
            gold_snippet: Some("not in any chunk".into()),
            answer: Some("Moon, probably".into()),
        };
        // first word is "moon," which no chunk contains
        assert!(by_answer.gold_ids(&chunks).is_empty());

        let by_answer = EvalQuery {
            query: "q".into(),
            gold_snippet: None,
            answer: Some("Paris".into()),
        };
        assert_eq!(by_answer.gold_ids(&chunks), BTreeSet::from([0]));
    }

    #[test]
    fn test_evaluate_reports_every_mode() {
        let queries = vec![
            EvalQuery {
                query: "capital of France".into(),
                gold_snippet: Some("Paris".into()),
                answer: None,
            },
            EvalQuery {
                query: "Moon orbits".into(),
                gold_snippet: Some("orbits the Earth".into()),
                answer: None,
            },
            EvalQuery {
                query: "something unlabeled".into(),
                gold_snippet: None,
                answer: None,
            },
        ];

        let report = evaluate(&retriever(), &queries, &SearchOptions::default()).unwrap();
        assert_eq!(report.queries, 3);
        assert_eq!(report.unlabeled, 1);
        assert_eq!(report.modes.len(), 3);

        let lexical = report.mode(RetrievalMode::Lexical).unwrap();
        assert_eq!(lexical.recall.keys().copied().collect::<Vec<_>>(), vec![1, 3, 5]);
        // both labelled queries hit at rank 1 lexically; the unlabeled one scores 0
        assert!((lexical.recall[&1] - 2.0 / 3.0).abs() < 1e-6);
        assert!((lexical.mrr - 2.0 / 3.0).abs() < 1e-6);
        for metrics in &report.modes {
            assert!(metrics.recall[&1] <= metrics.recall[&3]);
            assert!(metrics.recall[&3] <= metrics.recall[&5]);
        }
    }

    #[test]
    fn test_evaluate_without_corpus_fails() {
        let retriever = HybridRetriever::new(None, Arc::new(HashingEmbedder::default()));
        assert!(evaluate(&retriever, &[], &SearchOptions::default()).is_err());
    }

    #[test]
    fn test_load_jsonl_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"query": "capital of France", "gold_snippet": "Paris"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"query": "moon", "answer": "27 days"}}"#).unwrap();

        let queries = EvalQuery::load_jsonl(file.path()).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].answer.as_deref(), Some("27 days"));
        assert!(queries[1].gold_snippet.is_none());
    }
}
