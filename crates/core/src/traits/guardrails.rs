//! Guardrail traits

use serde::{Deserialize, Serialize};

use crate::Source;

/// Outcome of a query safety check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub is_safe: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SafetyVerdict {
    pub fn safe() -> Self {
        Self {
            is_safe: true,
            reason: None,
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            is_safe: false,
            reason: Some(reason.into()),
        }
    }
}

/// Outcome of answer validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ValidationVerdict {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            warning: None,
        }
    }

    pub fn invalid(warning: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            warning: Some(warning.into()),
        }
    }
}

/// Pre-retrieval topic filter
pub trait QuerySafety: Send + Sync {
    fn check_query_safety(&self, query: &str) -> SafetyVerdict;
}

/// Post-generation answer check
pub trait AnswerValidator: Send + Sync {
    fn validate_answer(&self, answer: &str, sources: &[Source]) -> ValidationVerdict;
}

/// Personal-data scrubber; must be idempotent
pub trait PiiRedactor: Send + Sync {
    fn redact_pii(&self, text: &str) -> String;
}
