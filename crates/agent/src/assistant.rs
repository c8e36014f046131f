//! Guarded question answering
//!
//! Wraps the grounding engine with the query-side and answer-side guardrails
//! and with per-session follow-up selection.

use std::sync::Arc;

use grounded_qa_core::{AnswerValidator, PiiRedactor, QueryResult, QuerySafety};
use grounded_qa_text_processing::{parse_followups, Guardrails};
use serde::{Deserialize, Serialize};

use crate::engine::{AnswerGroundingEngine, QueryOptions};
use crate::session::ChatSession;

/// Per-request overrides; `None` uses the configured default
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AskOptions {
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub explain: Option<bool>,
    #[serde(default)]
    pub followups: Option<bool>,
}

impl AskOptions {
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = Some(explain);
        self
    }

    pub fn with_followups(mut self, followups: bool) -> Self {
        self.followups = Some(followups);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    Blocked {
        reason: String,
    },
    Answered {
        /// The question actually asked, after follow-up selection
        question: String,
        result: QueryResult,
        /// Parsed follow-up list, selectable by 1-based position next turn
        followups: Vec<String>,
    },
}

impl Reply {
    pub fn result(&self) -> Option<&QueryResult> {
        match self {
            Reply::Answered { result, .. } => Some(result),
            Reply::Blocked { .. } => None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Reply::Blocked { .. })
    }
}

pub struct Assistant {
    engine: Arc<AnswerGroundingEngine>,
    guardrails: Guardrails,
}

impl Assistant {
    pub fn new(engine: Arc<AnswerGroundingEngine>, guardrails: Guardrails) -> Self {
        Self { engine, guardrails }
    }

    pub fn engine(&self) -> &AnswerGroundingEngine {
        &self.engine
    }

    /// One conversational turn: `input` is either a follow-up number from the
    /// previous answer or a new question
    pub async fn ask(&self, session: &mut ChatSession, input: &str, options: &AskOptions) -> Reply {
        let resolved = session.resolve_input(input);
        let reply = self.answer(resolved.question(), options).await;

        if let Some(result) = reply.result() {
            session.remember_followups(&result.followup_questions);
        }
        reply
    }

    /// Answer a single question without session state
    pub async fn answer(&self, question: &str, options: &AskOptions) -> Reply {
        let verdict = self.guardrails.check_query_safety(question);
        if !verdict.is_safe {
            tracing::info!(query_chars = question.chars().count(), "Query blocked before retrieval");
            return Reply::Blocked {
                reason: verdict.reason.unwrap_or_default(),
            };
        }

        let grounding = self.engine.grounding();
        let (style_suffix, style_warning) = grounding.style_suffix(options.style.as_deref());
        let query_options = QueryOptions {
            style_suffix,
            explain: options.explain.unwrap_or(grounding.explain),
            generate_followups: options.followups.unwrap_or(grounding.followups),
        };

        let mut result = self.engine.query(question, &query_options).await;
        if let Some(warning) = style_warning {
            tracing::warn!(%warning, "Falling back to default answer style");
            result.warnings.insert(0, warning.to_string());
        }
        self.guard_answer(&mut result);

        let followups = parse_followups(&result.followup_questions);
        Reply::Answered {
            question: question.to_string(),
            result,
            followups,
        }
    }

    fn guard_answer(&self, result: &mut QueryResult) {
        if result.is_failure() {
            return;
        }
        result.answer = self.guardrails.redact_pii(&result.answer);
        result.followup_questions = self.guardrails.redact_pii(&result.followup_questions);

        let verdict = self.guardrails.validate_answer(&result.answer, &result.sources);
        if let Some(warning) = verdict.warning.filter(|_| !verdict.is_valid) {
            tracing::warn!(%warning, "Answer failed validation");
            result.warnings.push(warning);
        }
    }
}
