//! Uncited-claim detection
//!
//! An answer is split into sentences; each non-empty sentence is a claim
//! needing a citation unless it is a numbered list item, a disclaimer, already
//! tagged, or too short to assert anything.

mod rules;

pub use rules::{ClaimRule, ClaimRules, RuleVerdict};

use grounded_qa_config::constants::grounding::MIN_CLAIM_WORDS;
use grounded_qa_core::split_sentences;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::citations::has_citation_tag;

static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+[.)]\s").expect("valid numbered item regex"));

/// How a sentence was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceClass {
    NumberedItem,
    Disclaimer,
    Cited,
    Fragment,
    UncitedClaim,
}

impl SentenceClass {
    pub fn needs_citation(&self) -> bool {
        matches!(self, Self::UncitedClaim)
    }
}

#[derive(Debug, Clone)]
pub struct ClaimAnalyzer {
    rules: ClaimRules,
    min_claim_words: usize,
}

impl Default for ClaimAnalyzer {
    fn default() -> Self {
        Self::new(ClaimRules::default())
    }
}

impl ClaimAnalyzer {
    pub fn new(rules: ClaimRules) -> Self {
        Self {
            rules,
            min_claim_words: MIN_CLAIM_WORDS,
        }
    }

    /// Built-in rules, or those in `path` when given; a bad file falls back
    /// to the built-in table with a warning
    pub fn from_path(path: Option<&str>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match ClaimRules::load(path) {
            Ok(rules) => {
                tracing::info!(path, rules = rules.rules.len(), "Loaded claim rules");
                Self::new(rules)
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "Failed to load claim rules, using defaults");
                Self::default()
            }
        }
    }

    pub fn rules(&self) -> &ClaimRules {
        &self.rules
    }

    pub fn classify(&self, sentence: &str) -> SentenceClass {
        if NUMBERED_ITEM.is_match(sentence) {
            return SentenceClass::NumberedItem;
        }
        if has_citation_tag(sentence) {
            return SentenceClass::Cited;
        }
        match self.rules.verdict(sentence) {
            Some(RuleVerdict::Disclaimer) => SentenceClass::Disclaimer,
            Some(RuleVerdict::Claim) => SentenceClass::UncitedClaim,
            None if sentence.split_whitespace().count() <= self.min_claim_words => {
                SentenceClass::Fragment
            }
            None => SentenceClass::UncitedClaim,
        }
    }

    /// Sentences of `answer` that assert something without a citation
    pub fn uncited_claims(&self, answer: &str) -> Vec<String> {
        split_sentences(answer)
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .filter(|s| self.classify(s).needs_citation())
            .collect()
    }

    pub fn has_uncited_claims(&self, answer: &str) -> bool {
        !self.uncited_claims(answer).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cited_answer_has_no_uncited_claims() {
        let analyzer = ClaimAnalyzer::default();
        assert!(!analyzer.has_uncited_claims("Paris is the capital. [Source 1]"));
        assert!(!analyzer.has_uncited_claims(
            "Paris is the capital and the largest city of France [Source 1]."
        ));
    }

    #[test]
    fn test_long_untagged_sentence_is_uncited() {
        let analyzer = ClaimAnalyzer::default();
        let uncited = analyzer.uncited_claims(
            "Paris is the capital and the largest city of France. It is old [Source 1].",
        );
        assert_eq!(
            uncited,
            vec!["Paris is the capital and the largest city of France."]
        );
    }

    #[test]
    fn test_exemptions() {
        let analyzer = ClaimAnalyzer::default();
        assert_eq!(
            analyzer.classify("1. What else is in the sources about Paris?"),
            SentenceClass::NumberedItem
        );
        assert_eq!(
            analyzer.classify("2) Which river flows through the city of Paris?"),
            SentenceClass::NumberedItem
        );
        assert_eq!(
            analyzer.classify("The sources do not say when the tower was painted."),
            SentenceClass::Disclaimer
        );
        assert_eq!(analyzer.classify("Yes, that is right."), SentenceClass::Fragment);
        assert_eq!(
            analyzer.classify("Water boils at one hundred degrees at sea level [External Knowledge]."),
            SentenceClass::Cited
        );
    }

    #[test]
    fn test_six_word_boundary() {
        let analyzer = ClaimAnalyzer::default();
        assert_eq!(analyzer.classify("one two three four five six."), SentenceClass::Fragment);
        assert_eq!(
            analyzer.classify("one two three four five six seven."),
            SentenceClass::UncitedClaim
        );
    }

    #[test]
    fn test_claim_rule_overrides_fragment() {
        let rules = ClaimRules {
            version: "test".into(),
            rules: vec![ClaimRule {
                phrase: "guaranteed".into(),
                verdict: RuleVerdict::Claim,
            }],
        };
        let analyzer = ClaimAnalyzer::new(rules);
        assert_eq!(analyzer.classify("Returns are guaranteed."), SentenceClass::UncitedClaim);
    }

    #[test]
    fn test_bad_rules_path_falls_back() {
        let analyzer = ClaimAnalyzer::from_path(Some("/nonexistent/claims.yaml"));
        assert_eq!(analyzer.rules(), &ClaimRules::default());
    }

    #[test]
    fn test_empty_answer() {
        assert!(ClaimAnalyzer::default().uncited_claims("  \n ").is_empty());
    }
}
