//! Text analysis around generated answers
//!
//! This crate provides:
//! - **Citations**: `[Source N]` parsing, evidence maps, external-knowledge tags
//! - **Claims**: per-sentence classification of uncited claims against a rule table
//! - **Follow-ups**: parsing suggested questions out of free text
//! - **PII**: toggleable regex redaction of emails, phones, SSNs and card numbers
//! - **Guardrails**: topic blocking and answer validation
//!
//! # Example
//!
//! ```ignore
//! use grounded_qa_text_processing::{ClaimAnalyzer, Guardrails};
//!
//! let analyzer = ClaimAnalyzer::default();
//! let uncited = analyzer.uncited_claims("Paris is the capital and largest city of France.");
//! assert_eq!(uncited.len(), 1);
//! ```

pub mod citations;
pub mod claims;
pub mod followups;
pub mod guardrails;
pub mod pii;

mod error;

pub use error::{Result, TextProcessingError};

pub use citations::{
    build_evidence_map, cited_source_ids, has_citation_tag, has_external_knowledge,
    strip_answer_label, EvidenceMap,
};
pub use claims::{ClaimAnalyzer, ClaimRule, ClaimRules, RuleVerdict, SentenceClass};
pub use followups::{parse_followups, strip_followup_label};
pub use guardrails::Guardrails;
pub use pii::RegexPiiRedactor;
