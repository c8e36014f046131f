//! Per-session follow-up state

use grounded_qa_text_processing::parse_followups;
use serde::Serialize;

/// What a turn's input turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedInput {
    /// A 1-based position that selected a remembered follow-up
    Followup { index: usize, question: String },
    Question(String),
}

impl ResolvedInput {
    pub fn question(&self) -> &str {
        match self {
            ResolvedInput::Followup { question, .. } => question,
            ResolvedInput::Question(question) => question,
        }
    }
}

/// Conversation state owned by one client
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatSession {
    pub id: String,
    /// Follow-ups suggested by the last answer, in order
    pub followups: Vec<String>,
    pub turns: usize,
}

impl ChatSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// A valid 1-based position selects that follow-up; anything else is a
    /// new question
    pub fn resolve_input(&self, input: &str) -> ResolvedInput {
        let trimmed = input.trim();
        let selected = trimmed
            .parse::<usize>()
            .ok()
            .filter(|&n| n >= 1)
            .and_then(|n| self.followups.get(n - 1).map(|q| (n, q)));

        match selected {
            Some((index, question)) => {
                tracing::debug!(session = %self.id, index, "Selected follow-up");
                ResolvedInput::Followup {
                    index,
                    question: question.clone(),
                }
            }
            None => ResolvedInput::Question(trimmed.to_string()),
        }
    }

    /// Replace the remembered list with the questions parsed from `text`
    pub fn remember_followups(&mut self, text: &str) {
        self.followups = parse_followups(text);
        self.turns += 1;
    }
}
