//! Regex PII redaction
//!
//! Each pattern kind has its own placeholder. Placeholders contain neither
//! digits nor `@`, so redacting already-redacted text changes nothing.

use grounded_qa_config::PiiConfig;
use grounded_qa_core::PiiRedactor;
use once_cell::sync::Lazy;
use regex::Regex;

static CREDIT_CARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b").expect("valid card regex")
});

static SSN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid ssn regex"));

static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").expect("valid phone regex")
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid email regex")
});

pub const EMAIL_PLACEHOLDER: &str = "[REDACTED_EMAIL]";
pub const PHONE_PLACEHOLDER: &str = "[REDACTED_PHONE]";
pub const SSN_PLACEHOLDER: &str = "[REDACTED_SSN]";
pub const CREDIT_CARD_PLACEHOLDER: &str = "[REDACTED_CC]";

/// PII redactor with independently toggleable patterns
#[derive(Debug, Clone, Default)]
pub struct RegexPiiRedactor {
    config: PiiConfig,
}

impl RegexPiiRedactor {
    pub fn new(config: PiiConfig) -> Self {
        Self { config }
    }

    /// Longest digit patterns go first so a card number is never partly
    /// consumed as a phone number
    fn patterns(&self) -> impl Iterator<Item = (&'static Regex, &'static str)> + '_ {
        [
            (self.config.credit_card, &*CREDIT_CARD, CREDIT_CARD_PLACEHOLDER),
            (self.config.ssn, &*SSN, SSN_PLACEHOLDER),
            (self.config.phone, &*PHONE, PHONE_PLACEHOLDER),
            (self.config.email, &*EMAIL, EMAIL_PLACEHOLDER),
        ]
        .into_iter()
        .filter(|(enabled, _, _)| *enabled)
        .map(|(_, regex, placeholder)| (regex, placeholder))
    }

    pub fn redact(&self, text: &str) -> String {
        let mut redacted = text.to_string();
        for (regex, placeholder) in self.patterns() {
            if regex.is_match(&redacted) {
                redacted = regex.replace_all(&redacted, placeholder).into_owned();
            }
        }
        redacted
    }
}

impl PiiRedactor for RegexPiiRedactor {
    fn redact_pii(&self, text: &str) -> String {
        self.redact(text)
    }
}
