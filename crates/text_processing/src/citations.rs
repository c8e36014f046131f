//! Citation parsing
//!
//! Answers cite the numbered context blocks of the prompt as `[Source N]`
//! and mark ungrounded statements with `[External Knowledge]` (or the short
//! form `[External]`).

use std::collections::BTreeSet;

use grounded_qa_core::{truncate_chars, EvidenceMapEntry, Source};
use once_cell::sync::Lazy;
use regex::Regex;

static SOURCE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[Source\s+(\d+)\]").expect("valid source tag regex"));

const EXTERNAL_TAGS: [&str; 2] = ["[External Knowledge]", "[External]"];
const ANSWER_LABEL: &str = "answer:";

/// Distinct source numbers cited in `answer`, ascending
pub fn cited_source_ids(answer: &str) -> BTreeSet<usize> {
    SOURCE_TAG
        .captures_iter(answer)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect()
}

/// Whether `text` carries a source or external-knowledge tag
pub fn has_citation_tag(text: &str) -> bool {
    SOURCE_TAG.is_match(text) || has_external_knowledge(text)
}

pub fn has_external_knowledge(answer: &str) -> bool {
    EXTERNAL_TAGS.iter().any(|tag| answer.contains(tag))
}

/// Remove an echoed leading `Answer:` label
pub fn strip_answer_label(text: &str) -> &str {
    let trimmed = text.trim_start();
    match trimmed.get(..ANSWER_LABEL.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(ANSWER_LABEL) => {
            trimmed[ANSWER_LABEL.len()..].trim_start()
        }
        _ => trimmed,
    }
}

/// Evidence map plus the cited numbers that matched no source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceMap {
    pub entries: Vec<EvidenceMapEntry>,
    pub unresolved: Vec<usize>,
}

/// Resolve every distinct `[Source N]` in `answer` against the 1-based
/// `sources`, ordered by ascending id
pub fn build_evidence_map(answer: &str, sources: &[Source], span_chars: usize) -> EvidenceMap {
    let mut map = EvidenceMap::default();
    for id in cited_source_ids(answer) {
        match sources.iter().find(|s| s.id == id) {
            Some(source) => map.entries.push(EvidenceMapEntry {
                source_id: id,
                source_title: source.title.clone(),
                span: span(&source.text, span_chars),
            }),
            None => map.unresolved.push(id),
        }
    }
    map
}

fn span(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    if cut.len() < text.len() {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}
