//! Lexical index backed by Tantivy
//!
//! Each Tantivy document carries a stored `chunk_id` and an indexed `text`
//! field. Scores are Tantivy's BM25, mapped back onto chunk ids.

use std::path::Path;

use grounded_qa_core::{Chunk, LexicalIndex};
use tantivy::{
    collector::TopDocs,
    query::{BooleanQuery, Occur, Query, TermQuery},
    schema::{
        Field, IndexRecordOption, OwnedValue, Schema, TextFieldIndexing, TextOptions, INDEXED,
        STORED,
    },
    tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer, TokenStream},
    Index, IndexReader, IndexWriter, TantivyDocument, Term,
};

use crate::RagError;

const TOKENIZER: &str = "grounded";
const WRITER_HEAP_BYTES: usize = 50_000_000;

fn analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(100))
        .filter(LowerCaser)
        .build()
}

fn schema() -> (Schema, Field, Field) {
    let mut builder = Schema::builder();
    let id_field = builder.add_u64_field("chunk_id", INDEXED | STORED);
    let indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_field =
        builder.add_text_field("text", TextOptions::default().set_indexing_options(indexing));
    (builder.build(), id_field, text_field)
}

pub struct TantivyLexicalIndex {
    index: Index,
    reader: IndexReader,
    id_field: Field,
    text_field: Field,
    num_docs: usize,
}

impl TantivyLexicalIndex {
    /// Build an in-memory index over `chunks`
    pub fn build_in_ram(chunks: &[Chunk]) -> Result<Self, RagError> {
        let (schema, _, _) = schema();
        let index = Index::create_in_ram(schema);
        Self::populate(index, chunks)
    }

    /// Build a persistent index in `dir` over `chunks`
    pub fn create_in_dir(dir: impl AsRef<Path>, chunks: &[Chunk]) -> Result<Self, RagError> {
        std::fs::create_dir_all(dir.as_ref())?;
        let (schema, _, _) = schema();
        let index =
            Index::create_in_dir(dir.as_ref(), schema).map_err(|e| RagError::Index(e.to_string()))?;
        Self::populate(index, chunks)
    }

    /// Open an index previously written by [`Self::create_in_dir`]
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, RagError> {
        let index = Index::open_in_dir(dir.as_ref()).map_err(|e| RagError::Index(e.to_string()))?;
        Self::from_index(index)
    }

    fn populate(index: Index, chunks: &[Chunk]) -> Result<Self, RagError> {
        index.tokenizers().register(TOKENIZER, analyzer());
        let schema = index.schema();
        let id_field = field(&schema, "chunk_id")?;
        let text_field = field(&schema, "text")?;

        let mut writer: IndexWriter = index
            .writer_with_num_threads(1, WRITER_HEAP_BYTES)
            .map_err(|e| RagError::Index(e.to_string()))?;
        for chunk in chunks {
            let mut doc = TantivyDocument::default();
            doc.add_u64(id_field, chunk.id as u64);
            doc.add_text(text_field, &chunk.text);
            writer
                .add_document(doc)
                .map_err(|e| RagError::Index(e.to_string()))?;
        }
        writer
            .commit()
            .map_err(|e| RagError::Index(e.to_string()))?;

        Self::from_index(index)
    }

    fn from_index(index: Index) -> Result<Self, RagError> {
        index.tokenizers().register(TOKENIZER, analyzer());
        let schema = index.schema();
        let id_field = field(&schema, "chunk_id")?;
        let text_field = field(&schema, "text")?;
        let reader = index.reader().map_err(|e| RagError::Index(e.to_string()))?;
        let num_docs = reader.searcher().num_docs() as usize;

        Ok(Self {
            index,
            reader,
            id_field,
            text_field,
            num_docs,
        })
    }

    fn analyze(&self, text: &str) -> Vec<String> {
        let mut analyzer = self
            .index
            .tokenizers()
            .get(TOKENIZER)
            .unwrap_or_else(analyzer);
        let mut stream = analyzer.token_stream(text);
        let mut terms = Vec::new();
        while stream.advance() {
            terms.push(stream.token().text.clone());
        }
        terms
    }
}

fn field(schema: &Schema, name: &str) -> Result<Field, RagError> {
    schema
        .get_field(name)
        .map_err(|e| RagError::Index(format!("{name}: {e}")))
}

impl LexicalIndex for TantivyLexicalIndex {
    fn score_all(&self, tokens: &[&str]) -> grounded_qa_core::Result<Vec<f32>> {
        let mut scores = vec![0.0f32; self.num_docs];
        let terms: Vec<String> = tokens.iter().flat_map(|t| self.analyze(t)).collect();
        if terms.is_empty() || self.num_docs == 0 {
            return Ok(scores);
        }

        let clauses: Vec<(Occur, Box<dyn Query>)> = terms
            .iter()
            .map(|t| {
                let term = Term::from_field_text(self.text_field, t);
                let query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                (Occur::Should, query)
            })
            .collect();
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let hits = searcher
            .search(&query, &TopDocs::with_limit(self.num_docs))
            .map_err(|e| RagError::Index(e.to_string()))?;

        for (score, address) in hits {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| RagError::Index(e.to_string()))?;
            if let Some(OwnedValue::U64(id)) = doc.get_first(self.id_field) {
                if let Some(slot) = scores.get_mut(*id as usize) {
                    *slot = score;
                }
            }
        }

        Ok(scores)
    }

    fn idf(&self, term: &str) -> f32 {
        let Some(analyzed) = self.analyze(term).into_iter().next() else {
            return 0.0;
        };
        let searcher = self.reader.searcher();
        let n = searcher.num_docs() as f32;
        let df = searcher
            .doc_freq(&Term::from_field_text(self.text_field, &analyzed))
            .unwrap_or(0) as f32;
        if df == 0.0 {
            return 0.0;
        }
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn len(&self) -> usize {
        self.num_docs
    }

    fn name(&self) -> &str {
        "tantivy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks() -> Vec<Chunk> {
        vec![
            Chunk::new(0, "geo.txt", "Paris is the capital of France."),
            Chunk::new(1, "geo.txt", "Berlin is the capital of Germany."),
            Chunk::new(2, "food.txt", "Bread and cheese are French staples."),
        ]
    }

    #[test]
    fn test_scores_map_to_chunk_ids() {
        let index = TantivyLexicalIndex::build_in_ram(&chunks()).unwrap();
        assert_eq!(index.len(), 3);

        let scores = index.score_all(&["France?", "capital"]).unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores[0] > scores[1]);
        assert!(scores[1] > 0.0);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn test_idf_prefers_rare_terms() {
        let index = TantivyLexicalIndex::build_in_ram(&chunks()).unwrap();
        assert!(index.idf("Germany") > index.idf("capital"));
        assert_eq!(index.idf("zebra"), 0.0);
        assert_eq!(index.idf("?!"), 0.0);
    }

    #[test]
    fn test_persisted_index_reopens() {
        let dir = tempfile::tempdir().unwrap();
        TantivyLexicalIndex::create_in_dir(dir.path(), &chunks()).unwrap();

        let reopened = TantivyLexicalIndex::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 3);
        let scores = reopened.score_all(&["bread"]).unwrap();
        assert!(scores[2] > 0.0);
    }

    #[test]
    fn test_punctuation_only_query() {
        let index = TantivyLexicalIndex::build_in_ram(&chunks()).unwrap();
        assert_eq!(index.score_all(&["?"]).unwrap(), vec![0.0; 3]);
    }
}
