//! Answer-grounding engine
//!
//! One call runs RETRIEVE → PROMPT-BUILD → GENERATE → POSTPROCESS, then the
//! optional EXPLAIN and FOLLOWUP stages. Failures of the main generation call
//! (or of retrieval) degrade the whole result; failures of the secondary calls
//! degrade only their own piece.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use grounded_qa_config::{GroundingConfig, ModelConfig, Settings};
use grounded_qa_core::{Generator, QueryResult, ScoredChunk, Source};
use grounded_qa_llm::{followup_prompt, generation_request, rationale_prompt, GroundedPromptBuilder};
use grounded_qa_rag::{HybridRetriever, SearchOptions};
use grounded_qa_text_processing::{strip_followup_label, ClaimAnalyzer};

use crate::postprocess::postprocess;
use crate::AgentError;

/// Pipeline stage, used as a structured logging field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Retrieve,
    PromptBuild,
    Generate,
    Postprocess,
    Explain,
    Followup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Retrieve => "retrieve",
            Stage::PromptBuild => "prompt_build",
            Stage::Generate => "generate",
            Stage::Postprocess => "postprocess",
            Stage::Explain => "explain",
            Stage::Followup => "followup",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call options
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Appended to the question inside the prompt only
    pub style_suffix: String,
    /// Attach ranking explanations and per-source rationales
    pub explain: bool,
    pub generate_followups: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            style_suffix: String::new(),
            explain: false,
            generate_followups: true,
        }
    }
}

impl QueryOptions {
    /// Defaults from configuration; the default style's suffix is applied
    pub fn from_config(config: &GroundingConfig) -> Self {
        let (style_suffix, _) = config.style_suffix(None);
        Self {
            style_suffix,
            explain: config.explain,
            generate_followups: config.followups,
        }
    }

    pub fn with_style_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.style_suffix = suffix.into();
        self
    }

    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    pub fn with_followups(mut self, generate: bool) -> Self {
        self.generate_followups = generate;
        self
    }
}

pub struct AnswerGroundingEngine {
    retriever: Arc<HybridRetriever>,
    generator: Arc<dyn Generator>,
    search: SearchOptions,
    model: ModelConfig,
    grounding: GroundingConfig,
    prompt_builder: GroundedPromptBuilder,
    claims: ClaimAnalyzer,
}

impl AnswerGroundingEngine {
    pub fn new(
        retriever: Arc<HybridRetriever>,
        generator: Arc<dyn Generator>,
        settings: &Settings,
    ) -> Self {
        let mut search = SearchOptions::from(&settings.retrieval);
        for warning in search.sanitize() {
            tracing::warn!(%warning, "Adjusted search options");
        }

        Self {
            retriever,
            generator,
            search,
            model: settings.model.clone(),
            grounding: settings.grounding.clone(),
            prompt_builder: GroundedPromptBuilder::new(settings.grounding.excerpt_chars),
            claims: ClaimAnalyzer::from_path(settings.grounding.claim_rules_path.as_deref()),
        }
    }

    pub fn with_claim_analyzer(mut self, claims: ClaimAnalyzer) -> Self {
        self.claims = claims;
        self
    }

    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    pub fn grounding(&self) -> &GroundingConfig {
        &self.grounding
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Answer `question` from the retrieved sources
    ///
    /// Never fails: a retrieval or generation error yields a degraded result
    /// (see [`QueryResult::generation_failure`]).
    pub async fn query(&self, question: &str, options: &QueryOptions) -> QueryResult {
        let started = Instant::now();
        let mut warnings = Vec::new();

        tracing::debug!(stage = %Stage::Retrieve, query = %question, top_k = self.search.top_k, alpha = self.search.alpha);
        let hits = match self.retrieve(question, options.explain).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::error!(stage = %Stage::Retrieve, error = %e, "Retrieval failed");
                return QueryResult::generation_failure(e, warnings);
            }
        };
        let mut sources: Vec<Source> = hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| Source::from_scored(i + 1, hit))
            .collect();

        tracing::debug!(stage = %Stage::PromptBuild, sources = sources.len());
        let prompt = self
            .prompt_builder
            .build(question, &options.style_suffix, &sources);
        let request = generation_request(prompt, &self.model);

        tracing::debug!(stage = %Stage::Generate, max_tokens = request.max_tokens, model = self.generator.model_name());
        let raw_answer = match self.generator.generate(&request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(stage = %Stage::Generate, error = %e, "Answer generation failed");
                return QueryResult::generation_failure(e, warnings);
            }
        };

        tracing::debug!(stage = %Stage::Postprocess);
        let processed = postprocess(
            &raw_answer,
            &sources,
            self.grounding.evidence_span_chars,
            &self.claims,
        );
        let uncited_warning = processed.uncited_warning();
        if uncited_warning {
            tracing::info!(uncited = processed.uncited_claims.len(), "Answer contains uncited claims");
        }
        warnings.extend(processed.warnings);

        if options.explain {
            tracing::debug!(stage = %Stage::Explain, sources = sources.len());
            self.attach_rationales(question, &mut sources).await;
        }

        let followup_questions = if options.generate_followups {
            tracing::debug!(stage = %Stage::Followup);
            self.followups(question, &processed.answer, &sources).await
        } else {
            String::new()
        };

        tracing::info!(
            sources = sources.len(),
            evidence = processed.evidence_map.len(),
            external = processed.has_external_knowledge,
            uncited = uncited_warning,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query answered"
        );

        QueryResult {
            answer: processed.answer,
            sources,
            evidence_map: processed.evidence_map,
            has_external_knowledge: processed.has_external_knowledge,
            uncited_warning,
            followup_questions,
            warnings,
        }
    }

    /// Search on the blocking pool with the raw question
    async fn retrieve(&self, question: &str, explain: bool) -> Result<Vec<ScoredChunk>, AgentError> {
        let retriever = Arc::clone(&self.retriever);
        let query = question.to_string();
        let options = self.search.clone().with_explain(explain);

        let started = Instant::now();
        let hits = tokio::task::spawn_blocking(move || retriever.search(&query, &options)).await??;
        tracing::debug!(
            candidates = hits.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Retrieval complete"
        );
        Ok(hits)
    }

    async fn attach_rationales(&self, question: &str, sources: &mut [Source]) {
        let requests: Vec<_> = sources
            .iter()
            .map(|source| {
                rationale_prompt(question, source, self.grounding.excerpt_chars, &self.model)
            })
            .collect();
        let replies = join_all(requests.iter().map(|r| self.generator.generate(r))).await;

        for (source, reply) in sources.iter_mut().zip(replies) {
            let reasoning = match reply {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    tracing::warn!(source = source.id, error = %e, "Rationale generation failed");
                    format!("⚠️ Unable to generate reasoning: {e}")
                }
            };
            if let Some(explanation) = source.explain.as_mut() {
                explanation.llm_reasoning = Some(reasoning);
            }
        }
    }

    async fn followups(&self, question: &str, answer: &str, sources: &[Source]) -> String {
        let request = followup_prompt(
            question,
            answer,
            sources,
            self.grounding.excerpt_chars,
            &self.model,
        );
        match self.generator.generate(&request).await {
            Ok(text) => strip_followup_label(&text),
            Err(e) => {
                tracing::warn!(error = %e, "Follow-up generation failed");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::PromptBuild.to_string(), "prompt_build");
        assert_eq!(Stage::Followup.as_str(), "followup");
    }

    #[test]
    fn test_query_options_from_config() {
        let mut config = GroundingConfig::default();
        config.default_style = "concise".into();
        config.explain = true;
        config.followups = false;

        let options = QueryOptions::from_config(&config);
        assert_eq!(options.style_suffix, " Answer in two or three sentences.");
        assert!(options.explain);
        assert!(!options.generate_followups);
    }

    #[test]
    fn test_query_options_builders() {
        let options = QueryOptions::default()
            .with_style_suffix(" Be brief.")
            .with_explain(true)
            .with_followups(false);
        assert_eq!(options.style_suffix, " Be brief.");
        assert!(options.explain);
        assert!(!options.generate_followups);
    }
}
