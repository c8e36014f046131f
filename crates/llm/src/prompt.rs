//! Prompt construction
//!
//! The grounded prompt lists each retrieved chunk as `[Source N] <title>`
//! followed by a bounded excerpt, then the question and the citation rules
//! the answer is later checked against.

use std::fmt::Write;

use grounded_qa_config::constants::grounding::{EXCERPT_CHARS, MAX_FOLLOWUPS};
use grounded_qa_config::ModelConfig;
use grounded_qa_core::{truncate_chars, GenerationRequest, Source};

const SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant that answers questions using the numbered sources below.";

const CITATION_RULES: &str = "\
- Cite the supporting source after every statement, e.g. [Source 1].
- If a statement uses knowledge that is not in the sources, mark it with [External Knowledge].
- If the sources do not contain the answer, say so.";

/// Max tokens for the follow-up suggestion call
const FOLLOWUP_MAX_TOKENS: usize = 128;
/// Max tokens for a per-source rationale
const RATIONALE_MAX_TOKENS: usize = 96;

/// Builds the citation-constrained answer prompt
#[derive(Debug, Clone)]
pub struct GroundedPromptBuilder {
    excerpt_chars: usize,
}

impl Default for GroundedPromptBuilder {
    fn default() -> Self {
        Self::new(EXCERPT_CHARS)
    }
}

impl GroundedPromptBuilder {
    pub fn new(excerpt_chars: usize) -> Self {
        Self {
            excerpt_chars: excerpt_chars.max(1),
        }
    }

    /// Assemble the prompt; `style_suffix` is appended to the question only
    pub fn build(&self, question: &str, style_suffix: &str, sources: &[Source]) -> String {
        let mut prompt = String::with_capacity(512 + sources.len() * (self.excerpt_chars + 64));
        prompt.push_str(SYSTEM_INSTRUCTION);
        write_context(&mut prompt, sources, self.excerpt_chars);

        let _ = write!(
            prompt,
            "\nQuestion: {}{}\n\nInstructions:\n{}\n\nAnswer:",
            question.trim(),
            style_suffix,
            CITATION_RULES
        );
        prompt
    }
}

/// `Context:` block listing each source as `[Source N] <title>` and its excerpt
fn write_context(prompt: &mut String, sources: &[Source], excerpt_chars: usize) {
    prompt.push_str("\n\nContext:\n");
    if sources.is_empty() {
        prompt.push_str("(no sources were found)\n");
    }
    for source in sources {
        let _ = writeln!(
            prompt,
            "[Source {}] {}\n{}\n",
            source.id,
            source.title,
            truncate_chars(&source.text, excerpt_chars).trim()
        );
    }
}

/// Prompt size estimate: whitespace-separated words
pub fn count_prompt_tokens(prompt: &str) -> usize {
    prompt.split_whitespace().count()
}

/// Output tokens left for the answer, bounded by the configured min and max
pub fn output_budget(prompt: &str, config: &ModelConfig) -> usize {
    config
        .ctx_tokens
        .saturating_sub(count_prompt_tokens(prompt))
        .saturating_sub(config.safety_margin)
        .min(config.max_output_tokens)
        .max(config.min_output_tokens)
}

/// Request for the main answer, with sampling parameters and budget from config
pub fn generation_request(prompt: String, config: &ModelConfig) -> GenerationRequest {
    let max_tokens = output_budget(&prompt, config);
    GenerationRequest {
        prompt,
        max_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
        repeat_penalty: config.repeat_penalty,
    }
}

/// Ask for up to three follow-up questions as a numbered list, restricted to
/// what the same sources can answer
pub fn followup_prompt(
    question: &str,
    answer: &str,
    sources: &[Source],
    excerpt_chars: usize,
    config: &ModelConfig,
) -> GenerationRequest {
    let mut prompt = format!(
        "Suggest up to {MAX_FOLLOWUPS} short follow-up questions a user might ask next. \
         Only suggest questions that the sources below can answer. \
         Reply with a numbered list only."
    );
    write_context(&mut prompt, sources, excerpt_chars.max(1));
    let _ = write!(
        prompt,
        "\nQuestion: {}\nAnswer: {}\n\nFollow-up questions:",
        question.trim(),
        answer.trim()
    );
    GenerationRequest {
        prompt,
        max_tokens: FOLLOWUP_MAX_TOKENS,
        temperature: config.temperature,
        top_p: config.top_p,
        repeat_penalty: config.repeat_penalty,
    }
}

/// Ask for one sentence on why `source` is relevant to `question`
pub fn rationale_prompt(
    question: &str,
    source: &Source,
    excerpt_chars: usize,
    config: &ModelConfig,
) -> GenerationRequest {
    let prompt = format!(
        "In one sentence, explain why the following passage is relevant to the question.\n\n\
         Question: {}\nPassage ({}): {}\n\nReason:",
        question.trim(),
        source.title,
        truncate_chars(&source.text, excerpt_chars).trim()
    );
    GenerationRequest {
        prompt,
        max_tokens: RATIONALE_MAX_TOKENS,
        temperature: config.temperature,
        top_p: config.top_p,
        repeat_penalty: config.repeat_penalty,
    }
}
