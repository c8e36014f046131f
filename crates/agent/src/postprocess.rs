//! Answer post-processing
//!
//! Turns raw model output into the grounded parts of a [`QueryResult`]:
//! cleaned answer text, evidence map, external-knowledge flag and the list of
//! sentences that assert something without a citation.
//!
//! [`QueryResult`]: grounded_qa_core::QueryResult

use grounded_qa_core::{EvidenceMapEntry, Source};
use grounded_qa_text_processing::{
    build_evidence_map, has_external_knowledge, strip_answer_label, ClaimAnalyzer,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostProcessed {
    pub answer: String,
    pub evidence_map: Vec<EvidenceMapEntry>,
    pub has_external_knowledge: bool,
    pub uncited_claims: Vec<String>,
    pub warnings: Vec<String>,
}

impl PostProcessed {
    pub fn uncited_warning(&self) -> bool {
        !self.uncited_claims.is_empty()
    }
}

pub fn postprocess(
    raw_answer: &str,
    sources: &[Source],
    span_chars: usize,
    claims: &ClaimAnalyzer,
) -> PostProcessed {
    let answer = strip_answer_label(raw_answer).trim_end().to_string();

    let evidence = build_evidence_map(&answer, sources, span_chars);
    let warnings = evidence
        .unresolved
        .iter()
        .map(|id| format!("Answer cites [Source {id}], which was not retrieved"))
        .collect();

    PostProcessed {
        has_external_knowledge: has_external_knowledge(&answer),
        uncited_claims: claims.uncited_claims(&answer),
        evidence_map: evidence.entries,
        warnings,
        answer,
    }
}
