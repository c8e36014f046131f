//! Claim classification rule table and loading

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, TextProcessingError};

/// What a matching phrase says about a sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleVerdict {
    /// The sentence says the sources lack the information; needs no citation
    Disclaimer,
    /// The sentence asserts something and needs a citation
    Claim,
}

/// Phrase → verdict; matched case-insensitively as a substring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRule {
    pub phrase: String,
    pub verdict: RuleVerdict,
}

impl ClaimRule {
    pub fn disclaimer(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            verdict: RuleVerdict::Disclaimer,
        }
    }
}

/// Ordered rule table; the first matching rule decides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRules {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub rules: Vec<ClaimRule>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

const DISCLAIMER_PHRASES: &[&str] = &[
    "not found in the sources",
    "not found in the context",
    "the sources do not",
    "the sources don't",
    "the context does not",
    "the context doesn't",
    "no information",
    "not mentioned",
    "cannot find",
    "can't find",
    "could not find",
    "not provided in",
    "i don't know",
    "i do not know",
    "unable to find",
    "does not contain",
    "do not contain",
    "don't contain",
    "doesn't contain",
    "not enough information",
    "insufficient information",
];

impl Default for ClaimRules {
    fn default() -> Self {
        Self {
            version: default_version(),
            rules: DISCLAIMER_PHRASES
                .iter()
                .map(|p| ClaimRule::disclaimer(*p))
                .collect(),
        }
    }
}

impl ClaimRules {
    /// Load rules from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TextProcessingError::RulesNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let rules: Self = serde_yaml::from_str(content)?;
        rules.validate()?;
        Ok(rules)
    }

    fn validate(&self) -> Result<()> {
        match self.rules.iter().position(|r| r.phrase.trim().is_empty()) {
            Some(i) => Err(TextProcessingError::InvalidRules(format!(
                "rule {} has an empty phrase",
                i
            ))),
            None => Ok(()),
        }
    }

    /// Verdict of the first rule whose phrase occurs in `sentence`
    pub fn verdict(&self, sentence: &str) -> Option<RuleVerdict> {
        let lower = sentence.to_lowercase();
        self.rules
            .iter()
            .find(|rule| lower.contains(&rule.phrase.to_lowercase()))
            .map(|rule| rule.verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_rules() {
        let rules = ClaimRules::default();
        assert!(!rules.rules.is_empty());
        assert_eq!(
            rules.verdict("The sources do not mention his birthplace."),
            Some(RuleVerdict::Disclaimer)
        );
        assert_eq!(rules.verdict("Paris is the capital of France."), None);
    }

    #[test]
    fn test_first_match_wins() {
        let yaml = r#"
version: "2"
rules:
  - phrase: "no information loss"
    verdict: claim
  - phrase: "no information"
    verdict: disclaimer
"#;
        let rules = ClaimRules::from_yaml(yaml).unwrap();
        assert_eq!(
            rules.verdict("The codec guarantees no information loss at all."),
            Some(RuleVerdict::Claim)
        );
        assert_eq!(
            rules.verdict("There is no information about that."),
            Some(RuleVerdict::Disclaimer)
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rules:\n  - phrase: \"beyond my sources\"\n    verdict: disclaimer").unwrap();

        let rules = ClaimRules::load(file.path()).unwrap();
        assert_eq!(rules.version, "1.0.0");
        assert_eq!(rules.rules.len(), 1);
    }

    #[test]
    fn test_invalid_rules_rejected() {
        assert!(ClaimRules::from_yaml("rules:\n  - phrase: \"\"\n    verdict: claim").is_err());
        assert!(ClaimRules::from_yaml("rules:\n  - phrase: x\n    verdict: maybe").is_err());
        assert!(matches!(
            ClaimRules::load("/nonexistent/rules.yaml"),
            Err(TextProcessingError::RulesNotFound(_))
        ));
    }
}
