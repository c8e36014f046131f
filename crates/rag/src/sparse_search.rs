//! In-memory BM25 Okapi lexical index
//!
//! Scores follow the classic Okapi formulation with `k1 = 1.5`, `b = 0.75`.
//! Terms whose idf would be negative (present in more than half the corpus)
//! are floored at `epsilon * mean_idf`.

use std::collections::HashMap;
use std::path::Path;

use grounded_qa_core::LexicalIndex;
use serde::{Deserialize, Serialize};

use crate::RagError;

const DEFAULT_K1: f32 = 1.5;
const DEFAULT_B: f32 = 0.75;
const DEFAULT_EPSILON: f32 = 0.25;

/// Lowercase and strip surrounding punctuation
pub fn normalize_term(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Whitespace tokenization followed by [`normalize_term`]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(normalize_term)
        .filter(|t| !t.is_empty())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bm25Index {
    k1: f32,
    b: f32,
    avgdl: f32,
    doc_lens: Vec<usize>,
    doc_freqs: Vec<HashMap<String, u32>>,
    idf: HashMap<String, f32>,
}

impl Bm25Index {
    /// Compute statistics for a tokenized corpus; document `i` is chunk id `i`
    pub fn from_tokenized(corpus: &[Vec<String>]) -> Self {
        let mut doc_lens = Vec::with_capacity(corpus.len());
        let mut doc_freqs = Vec::with_capacity(corpus.len());
        let mut containing: HashMap<String, u32> = HashMap::new();

        for doc in corpus {
            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in doc {
                let term = normalize_term(token);
                if term.is_empty() {
                    continue;
                }
                *freqs.entry(term).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *containing.entry(term.clone()).or_insert(0) += 1;
            }
            doc_lens.push(freqs.values().map(|&f| f as usize).sum());
            doc_freqs.push(freqs);
        }

        let n = corpus.len() as f32;
        let total_len: usize = doc_lens.iter().sum();
        let avgdl = if corpus.is_empty() {
            0.0
        } else {
            total_len as f32 / n
        };

        let mut idf = HashMap::with_capacity(containing.len());
        let mut idf_sum = 0.0f32;
        let mut negative = Vec::new();
        for (term, df) in containing {
            let df = df as f32;
            let value = (n - df + 0.5).ln() - (df + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }
        if !idf.is_empty() {
            let floor = DEFAULT_EPSILON * idf_sum / idf.len() as f32;
            for term in negative {
                idf.insert(term, floor);
            }
        }

        Self {
            k1: DEFAULT_K1,
            b: DEFAULT_B,
            avgdl,
            doc_lens,
            doc_freqs,
            idf,
        }
    }

    /// Tokenize raw chunk texts with [`tokenize`] and build the index
    pub fn from_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        let corpus: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t.as_ref())).collect();
        Self::from_tokenized(&corpus)
    }

    /// Load a saved index; per-document tables must agree in length
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RagError> {
        let file = std::fs::File::open(path.as_ref())?;
        let index: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        if index.doc_lens.len() != index.doc_freqs.len() {
            return Err(RagError::Index(format!(
                "{}: {} document lengths for {} documents",
                path.as_ref().display(),
                index.doc_lens.len(),
                index.doc_freqs.len()
            )));
        }
        Ok(index)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RagError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    fn score_doc(&self, doc: usize, terms: &[String]) -> f32 {
        let freqs = &self.doc_freqs[doc];
        let dl = self.doc_lens[doc] as f32;
        let norm = if self.avgdl > 0.0 { dl / self.avgdl } else { 0.0 };

        terms
            .iter()
            .map(|term| {
                let tf = freqs.get(term).copied().unwrap_or(0) as f32;
                if tf == 0.0 {
                    return 0.0;
                }
                let idf = self.idf.get(term).copied().unwrap_or(0.0);
                idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * (1.0 - self.b + self.b * norm))
            })
            .sum()
    }
}

impl LexicalIndex for Bm25Index {
    fn score_all(&self, tokens: &[&str]) -> grounded_qa_core::Result<Vec<f32>> {
        let terms: Vec<String> = tokens
            .iter()
            .map(|t| normalize_term(t))
            .filter(|t| !t.is_empty())
            .collect();
        Ok((0..self.doc_freqs.len())
            .map(|doc| self.score_doc(doc, &terms))
            .collect())
    }

    fn idf(&self, term: &str) -> f32 {
        self.idf.get(&normalize_term(term)).copied().unwrap_or(0.0)
    }

    fn len(&self) -> usize {
        self.doc_freqs.len()
    }

    fn name(&self) -> &str {
        "bm25"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Bm25Index {
        Bm25Index::from_texts(&[
            "Paris is the capital of France.",
            "Berlin is the capital of Germany.",
            "The Seine flows through Paris.",
            "Bread and cheese are French staples.",
        ])
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("What is  France?"), vec!["what", "is", "france"]);
        assert!(tokenize(" ?! ").is_empty());
    }

    #[test]
    fn test_scores_every_chunk() {
        let index = corpus();
        let scores = index.score_all(&["capital", "France?"]).unwrap();
        assert_eq!(scores.len(), 4);
        assert!(scores[0] > scores[1]);
        assert!(scores[0] > scores[2]);
        assert_eq!(scores[3], 0.0);
    }

    #[test]
    fn test_rare_term_has_higher_idf() {
        let index = corpus();
        assert!(index.idf("germany") > index.idf("capital"));
        assert_eq!(index.idf("unknown"), 0.0);
    }

    #[test]
    fn test_common_term_idf_floored() {
        // "the" appears in 3 of 4 docs: raw idf is negative
        let index = corpus();
        assert!(index.idf("the") >= 0.0);
    }

    #[test]
    fn test_empty_corpus() {
        let index = Bm25Index::from_texts::<&str>(&[]);
        assert!(index.is_empty());
        assert!(index.score_all(&["anything"]).unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bm25.json");
        corpus().save(&path).unwrap();
        let loaded = Bm25Index::load(&path).unwrap();
        assert_eq!(loaded.len(), 4);
        assert!((loaded.idf("germany") - corpus().idf("germany")).abs() < 1e-6);
    }

    #[test]
    fn test_load_rejects_inconsistent_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bm25.json");
        corpus().save(&path).unwrap();

        let mut raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        raw["doc_lens"].as_array_mut().unwrap().pop();
        std::fs::write(&path, raw.to_string()).unwrap();

        let err = Bm25Index::load(&path).unwrap_err();
        assert!(err.to_string().contains("3 document lengths for 4 documents"));
    }
}
