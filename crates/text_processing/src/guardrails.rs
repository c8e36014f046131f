//! Content guardrails
//!
//! - Topic blocking on the incoming query
//! - PII redaction of outgoing text
//! - Sanity validation of an answer against its sources

use grounded_qa_config::GuardrailsConfig;
use grounded_qa_core::{
    AnswerValidator, PiiRedactor, QuerySafety, SafetyVerdict, Source, ValidationVerdict,
};

use crate::pii::RegexPiiRedactor;

pub const ANSWER_TOO_SHORT: &str = "Answer too short or empty";
pub const NO_SOURCES: &str = "No sources retrieved - cannot answer";

#[derive(Debug, Clone)]
pub struct Guardrails {
    /// Lowercased topic paired with its configured spelling
    blocked_topics: Vec<(String, String)>,
    redactor: RegexPiiRedactor,
    min_answer_chars: usize,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self::from_config(&GuardrailsConfig::default())
    }
}

impl Guardrails {
    pub fn from_config(config: &GuardrailsConfig) -> Self {
        Self {
            blocked_topics: config
                .blocked_topics
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(|t| (t.to_lowercase(), t.to_string()))
                .collect(),
            redactor: RegexPiiRedactor::new(config.pii.clone()),
            min_answer_chars: config.min_answer_chars,
        }
    }
}

impl QuerySafety for Guardrails {
    fn check_query_safety(&self, query: &str) -> SafetyVerdict {
        let lower = query.to_lowercase();
        match self
            .blocked_topics
            .iter()
            .find(|(needle, _)| lower.contains(needle.as_str()))
        {
            Some((_, topic)) => {
                tracing::info!(topic = %topic, "Query blocked by topic guardrail");
                SafetyVerdict::blocked(format!("This topic is restricted: {}", topic))
            }
            None => SafetyVerdict::safe(),
        }
    }
}

impl PiiRedactor for Guardrails {
    fn redact_pii(&self, text: &str) -> String {
        self.redactor.redact(text)
    }
}

impl AnswerValidator for Guardrails {
    fn validate_answer(&self, answer: &str, sources: &[Source]) -> ValidationVerdict {
        if answer.trim().chars().count() < self.min_answer_chars {
            return ValidationVerdict::invalid(ANSWER_TOO_SHORT);
        }
        if sources.is_empty() {
            return ValidationVerdict::invalid(NO_SOURCES);
        }
        ValidationVerdict::valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grounded_qa_core::{Chunk, ScoredChunk};

    fn guardrails(topics: &[&str]) -> Guardrails {
        Guardrails::from_config(&GuardrailsConfig {
            blocked_topics: topics.iter().map(|t| t.to_string()).collect(),
            ..GuardrailsConfig::default()
        })
    }

    fn one_source() -> Vec<Source> {
        let chunk = Chunk::new(0, "geo.txt", "Paris is the capital of France.");
        vec![Source::from_scored(1, ScoredChunk::fused(chunk, 0.5, 0.5, 0.65))]
    }

    #[test]
    fn test_blocked_topic_case_insensitive() {
        let g = guardrails(&["Weapons", "  "]);
        let verdict = g.check_query_safety("How are WEAPONS made?");
        assert!(!verdict.is_safe);
        assert_eq!(verdict.reason.as_deref(), Some("This topic is restricted: Weapons"));

        let verdict = g.check_query_safety("What is the capital of France?");
        assert!(verdict.is_safe);
        assert!(verdict.reason.is_none());
    }

    #[test]
    fn test_no_topics_allows_everything() {
        assert!(Guardrails::default().check_query_safety("anything").is_safe);
    }

    #[test]
    fn test_short_answer_rejected_even_with_sources() {
        let verdict = Guardrails::default().validate_answer("  Paris  ", &one_source());
        assert!(!verdict.is_valid);
        assert_eq!(verdict.warning.as_deref(), Some(ANSWER_TOO_SHORT));
    }

    #[test]
    fn test_no_sources_rejected_regardless_of_length() {
        let verdict = Guardrails::default()
            .validate_answer("Paris is the capital of France, as everyone knows.", &[]);
        assert!(!verdict.is_valid);
        assert_eq!(verdict.warning.as_deref(), Some(NO_SOURCES));
    }

    #[test]
    fn test_valid_answer() {
        let verdict =
            Guardrails::default().validate_answer("Paris is the capital. [Source 1]", &one_source());
        assert!(verdict.is_valid);
        assert!(verdict.warning.is_none());
    }

    #[test]
    fn test_redaction_delegates() {
        let g = guardrails(&[]);
        assert_eq!(g.redact_pii("mail a@b.com"), "mail [REDACTED_EMAIL]");
    }
}
