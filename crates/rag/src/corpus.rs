//! Pre-built corpus index loading
//!
//! Layout of an index directory:
//!
//! ```text
//! index_dir/
//!   chunks.json   [{"id": 0, "title": "geo.txt", "text": "..."}, ...]
//!   dense.json    flat inner-product index, row i = chunk i
//!   bm25.json     BM25 statistics, doc i = chunk i
//!   lexical/      (alternative to bm25.json) Tantivy index
//! ```

use std::path::Path;

use grounded_qa_core::{Chunk, DenseIndex, LexicalIndex};

use crate::{Bm25Index, FlatVectorIndex, RagError, TantivyLexicalIndex};

pub const CHUNKS_FILE: &str = "chunks.json";
pub const DENSE_FILE: &str = "dense.json";
pub const BM25_FILE: &str = "bm25.json";
pub const TANTIVY_DIR: &str = "lexical";

/// Chunks plus both indexes over them
pub struct CorpusIndex {
    chunks: Vec<Chunk>,
    dense: Box<dyn DenseIndex>,
    lexical: Box<dyn LexicalIndex>,
}

impl std::fmt::Debug for CorpusIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorpusIndex")
            .field("chunks", &self.chunks.len())
            .field("dense", &self.dense.len())
            .field("lexical", &self.lexical.name())
            .finish()
    }
}

impl CorpusIndex {
    /// Assemble from parts; chunk ids must be their positions and both
    /// indexes must cover every chunk
    pub fn new(
        chunks: Vec<Chunk>,
        dense: Box<dyn DenseIndex>,
        lexical: Box<dyn LexicalIndex>,
    ) -> Result<Self, RagError> {
        if let Some((pos, chunk)) = chunks.iter().enumerate().find(|(i, c)| c.id != *i) {
            return Err(RagError::Index(format!(
                "chunk at position {} has id {}",
                pos, chunk.id
            )));
        }
        if dense.len() != chunks.len() {
            return Err(RagError::Index(format!(
                "dense index has {} vectors for {} chunks",
                dense.len(),
                chunks.len()
            )));
        }
        if lexical.len() != chunks.len() {
            return Err(RagError::Index(format!(
                "lexical index has {} documents for {} chunks",
                lexical.len(),
                chunks.len()
            )));
        }

        Ok(Self {
            chunks,
            dense,
            lexical,
        })
    }

    /// Load from an index directory
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, RagError> {
        let dir = dir.as_ref();

        let chunks_path = dir.join(CHUNKS_FILE);
        if !chunks_path.exists() {
            return Err(RagError::NotFound(chunks_path.display().to_string()));
        }
        let chunks: Vec<Chunk> =
            serde_json::from_reader(std::io::BufReader::new(std::fs::File::open(&chunks_path)?))?;

        let dense = FlatVectorIndex::load(dir.join(DENSE_FILE))?;

        let bm25_path = dir.join(BM25_FILE);
        let tantivy_path = dir.join(TANTIVY_DIR);
        let lexical: Box<dyn LexicalIndex> = if bm25_path.exists() {
            Box::new(Bm25Index::load(&bm25_path)?)
        } else if tantivy_path.is_dir() {
            Box::new(TantivyLexicalIndex::open(&tantivy_path)?)
        } else {
            return Err(RagError::NotFound(format!(
                "{} or {}",
                bm25_path.display(),
                tantivy_path.display()
            )));
        };

        let corpus = Self::new(chunks, Box::new(dense), lexical)?;
        tracing::info!(
            dir = %dir.display(),
            chunks = corpus.len(),
            lexical = corpus.lexical.name(),
            "Loaded corpus index"
        );
        Ok(corpus)
    }

    /// Load, logging and swallowing any failure
    pub fn try_load(dir: impl AsRef<Path>) -> Option<Self> {
        match Self::load(dir.as_ref()) {
            Ok(corpus) => Some(corpus),
            Err(e) => {
                tracing::warn!(
                    dir = %dir.as_ref().display(),
                    error = %e,
                    "Corpus index unavailable, retrieval will return no results"
                );
                None
            }
        }
    }

    /// Write `chunks.json`, `dense.json` and `bm25.json` for an already
    /// chunked and embedded corpus
    pub fn write(
        dir: impl AsRef<Path>,
        chunks: &[Chunk],
        dense: &FlatVectorIndex,
        lexical: &Bm25Index,
    ) -> Result<(), RagError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let file = std::fs::File::create(dir.join(CHUNKS_FILE))?;
        serde_json::to_writer(std::io::BufWriter::new(file), chunks)?;
        dense.save(dir.join(DENSE_FILE))?;
        lexical.save(dir.join(BM25_FILE))?;
        Ok(())
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, id: usize) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    pub fn dense(&self) -> &dyn DenseIndex {
        self.dense.as_ref()
    }

    pub fn lexical(&self) -> &dyn LexicalIndex {
        self.lexical.as_ref()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
