//! Answer-grounding and guardrail configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{grounding, guardrails};
use crate::ConfigWarning;

/// Prompt construction and post-processing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingConfig {
    /// Characters of each source placed in the prompt
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,

    /// Characters of each source placed in an evidence map entry
    #[serde(default = "default_evidence_span_chars")]
    pub evidence_span_chars: usize,

    /// Attach ranking explanations and per-source rationales by default
    #[serde(default)]
    pub explain: bool,

    /// Ask for follow-up questions by default
    #[serde(default = "default_true")]
    pub followups: bool,

    /// Style used when the caller names none
    #[serde(default = "default_style")]
    pub default_style: String,

    /// Named prompt suffixes
    #[serde(default = "default_styles")]
    pub styles: BTreeMap<String, String>,

    /// YAML file overriding the built-in claim classification rules
    #[serde(default)]
    pub claim_rules_path: Option<String>,
}

fn default_excerpt_chars() -> usize {
    grounding::EXCERPT_CHARS
}

fn default_evidence_span_chars() -> usize {
    grounding::EVIDENCE_SPAN_CHARS
}

fn default_true() -> bool {
    true
}

fn default_style() -> String {
    grounding::DEFAULT_STYLE.to_string()
}

fn default_styles() -> BTreeMap<String, String> {
    [
        ("auto", ""),
        ("concise", " Answer in two or three sentences."),
        (
            "detailed",
            " Give a thorough answer that covers every relevant detail in the sources.",
        ),
        ("bullet", " Answer as a short bulleted list."),
        (
            "eli5",
            " Explain the answer in simple terms a beginner would understand.",
        ),
    ]
    .into_iter()
    .map(|(name, suffix)| (name.to_string(), suffix.to_string()))
    .collect()
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            excerpt_chars: default_excerpt_chars(),
            evidence_span_chars: default_evidence_span_chars(),
            explain: false,
            followups: true,
            default_style: default_style(),
            styles: default_styles(),
            claim_rules_path: None,
        }
    }
}

impl GroundingConfig {
    /// Prompt suffix for `style`, falling back to the default style
    ///
    /// An unknown key resolves to the default style's suffix and a warning.
    pub fn style_suffix(&self, style: Option<&str>) -> (String, Option<ConfigWarning>) {
        let key = style.unwrap_or(&self.default_style);
        if let Some(suffix) = self.styles.get(key) {
            return (suffix.clone(), None);
        }

        let fallback = self
            .styles
            .get(&self.default_style)
            .cloned()
            .unwrap_or_default();
        let warning = ConfigWarning::new(
            "style",
            format!(
                "unknown answer style '{}'; using '{}'",
                key, self.default_style
            ),
        );
        (fallback, Some(warning))
    }

    pub fn sanitize(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !self.styles.contains_key(&self.default_style) {
            warnings.push(ConfigWarning::new(
                "grounding.default_style",
                format!(
                    "unknown style '{}'; using '{}'",
                    self.default_style,
                    grounding::DEFAULT_STYLE
                ),
            ));
            self.default_style = grounding::DEFAULT_STYLE.to_string();
            self.styles
                .entry(self.default_style.clone())
                .or_insert_with(String::new);
        }
        if self.excerpt_chars == 0 {
            warnings.push(ConfigWarning::new(
                "grounding.excerpt_chars",
                format!("must be at least 1; using {}", grounding::EXCERPT_CHARS),
            ));
            self.excerpt_chars = grounding::EXCERPT_CHARS;
        }
        if self.evidence_span_chars == 0 {
            warnings.push(ConfigWarning::new(
                "grounding.evidence_span_chars",
                format!(
                    "must be at least 1; using {}",
                    grounding::EVIDENCE_SPAN_CHARS
                ),
            ));
            self.evidence_span_chars = grounding::EVIDENCE_SPAN_CHARS;
        }

        warnings
    }
}

/// Independently toggleable PII patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiConfig {
    #[serde(default = "default_true")]
    pub email: bool,
    #[serde(default = "default_true")]
    pub phone: bool,
    #[serde(default = "default_true")]
    pub ssn: bool,
    #[serde(default = "default_true")]
    pub credit_card: bool,
}

impl Default for PiiConfig {
    fn default() -> Self {
        Self {
            email: true,
            phone: true,
            ssn: true,
            credit_card: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailsConfig {
    /// Case-insensitive substrings that make a query unsafe
    #[serde(default)]
    pub blocked_topics: Vec<String>,

    #[serde(default)]
    pub pii: PiiConfig,

    #[serde(default = "default_min_answer_chars")]
    pub min_answer_chars: usize,
}

fn default_min_answer_chars() -> usize {
    guardrails::MIN_ANSWER_CHARS
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            blocked_topics: Vec::new(),
            pii: PiiConfig::default(),
            min_answer_chars: default_min_answer_chars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_style_resolves() {
        let config = GroundingConfig::default();
        let (suffix, warning) = config.style_suffix(Some("concise"));
        assert_eq!(suffix, " Answer in two or three sentences.");
        assert!(warning.is_none());
    }

    #[test]
    fn test_missing_style_uses_default() {
        let config = GroundingConfig::default();
        let (suffix, warning) = config.style_suffix(None);
        assert!(suffix.is_empty());
        assert!(warning.is_none());
    }

    #[test]
    fn test_unknown_style_falls_back_with_warning() {
        let config = GroundingConfig {
            default_style: "concise".into(),
            ..Default::default()
        };
        let (suffix, warning) = config.style_suffix(Some("limerick"));
        assert_eq!(suffix, " Answer in two or three sentences.");
        let warning = warning.unwrap();
        assert!(warning.message.contains("limerick"));
    }

    #[test]
    fn test_unknown_default_style_sanitized() {
        let mut config = GroundingConfig {
            default_style: "poetic".into(),
            ..Default::default()
        };
        let warnings = config.sanitize();
        assert_eq!(warnings.len(), 1);
        assert_eq!(config.default_style, "auto");
    }

    #[test]
    fn test_guardrails_yaml_defaults() {
        let config: GuardrailsConfig =
            serde_yaml::from_str("blocked_topics: [weapons]\npii:\n  phone: false\n").unwrap();
        assert_eq!(config.blocked_topics, vec!["weapons"]);
        assert!(!config.pii.phone);
        assert!(config.pii.email);
        assert_eq!(config.min_answer_chars, 10);
    }
}
