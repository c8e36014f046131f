//! Ollama generation backend
//!
//! Non-streaming completions through `/api/generate`. Transient failures
//! (network errors, timeouts, 5xx) are retried with exponential backoff.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use grounded_qa_config::ModelConfig;
use grounded_qa_core::{GenerationError, GenerationRequest, Generator};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::LlmError;

/// Ollama client configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// API endpoint
    pub endpoint: String,
    /// Context window passed as `num_ctx`
    pub ctx_tokens: usize,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
    /// How long Ollama keeps the model loaded after a call ("5m", "-1", "0")
    pub keep_alive: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

impl From<&ModelConfig> for LlmConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            ctx_tokens: config.ctx_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(200),
            keep_alive: "5m".to_string(),
        }
    }
}

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    config: LlmConfig,
}

impl OllamaBackend {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint, path)
    }

    /// Whether the server answers at all
    pub async fn is_available(&self) -> bool {
        self.client
            .get(self.api_url("/tags"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Generate with retry logic for transient failures
    pub async fn complete(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        if request.prompt.trim().is_empty() {
            return Err(LlmError::MalformedPrompt("prompt is empty".to_string()));
        }

        let body = OllamaGenerateRequest {
            model: &self.config.model,
            prompt: &request.prompt,
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                top_p: request.top_p,
                repeat_penalty: request.repeat_penalty,
                num_predict: request.max_tokens as i32,
                num_ctx: self.config.ctx_tokens as u32,
            },
            keep_alive: &self.config.keep_alive,
        };

        let start = Instant::now();
        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    "LLM request failed, retrying in {:?} (attempt {}/{})",
                    backoff,
                    attempt,
                    self.config.max_retries
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute_request(&body).await {
                Ok(response) => {
                    tracing::debug!(
                        model = %self.config.model,
                        max_tokens = request.max_tokens,
                        eval_count = response.eval_count.unwrap_or(0),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Generation complete"
                    );
                    return Ok(response.response.trim().to_string());
                }
                Err(e) if e.is_retryable() => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Network("Max retries exceeded".to_string())))
    }

    /// Execute a single request (used by retry logic)
    async fn execute_request(
        &self,
        body: &OllamaGenerateRequest<'_>,
    ) -> Result<OllamaGenerateResponse, LlmError> {
        let response = self
            .client
            .post(self.api_url("/generate"))
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND => LlmError::ModelNotFound(self.config.model.clone()),
                StatusCode::BAD_REQUEST => LlmError::MalformedPrompt(message),
                _ => LlmError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    fn map_transport_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.config.timeout.as_secs())
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl Generator for OllamaBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.complete(request).await.map_err(Into::into)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Ollama API types
#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
    keep_alive: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
    num_predict: i32,
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as HttpStatus, routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn backend(endpoint: String, max_retries: u32) -> OllamaBackend {
        OllamaBackend::new(LlmConfig {
            endpoint,
            max_retries,
            initial_backoff: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
            ..LlmConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_config_from_model_config() {
        let model = ModelConfig {
            endpoint: "http://ollama:11434/".into(),
            timeout_secs: 5,
            ..ModelConfig::default()
        };
        let config = LlmConfig::from(&model);
        assert_eq!(config.endpoint, "http://ollama:11434");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.ctx_tokens, 2048);
    }

    #[test]
    fn test_request_serialization() {
        let body = OllamaGenerateRequest {
            model: "llama3.2:3b",
            prompt: "Question: hi\nAnswer:",
            stream: false,
            options: OllamaOptions {
                temperature: 0.2,
                top_p: 0.9,
                repeat_penalty: 1.1,
                num_predict: 128,
                num_ctx: 2048,
            },
            keep_alive: "5m",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 128);
        assert_eq!(json["options"]["num_ctx"], 2048);
        assert!(json["options"]["repeat_penalty"].as_f64().unwrap() > 1.0);
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let backend = backend("http://127.0.0.1:1".into(), 0);
        let err = backend
            .generate(&GenerationRequest::new("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedPrompt(_)));
    }

    #[tokio::test]
    async fn test_generate_returns_trimmed_text() {
        let router = Router::new().route(
            "/api/generate",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["options"]["num_predict"], 64);
                Json(serde_json::json!({
                    "response": "  Paris is the capital of France [Source 1].\n",
                    "done": true,
                    "eval_count": 12
                }))
            }),
        );
        let backend = backend(serve(router).await, 0);

        let text = backend
            .generate(&GenerationRequest::new("Question: capital?").with_max_tokens(64))
            .await
            .unwrap();
        assert_eq!(text, "Paris is the capital of France [Source 1].");
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/api/generate",
            post(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err((HttpStatus::SERVICE_UNAVAILABLE, "loading model"))
                    } else {
                        Ok(Json(serde_json::json!({ "response": "ok", "done": true })))
                    }
                }
            }),
        );
        let backend = backend(serve(router).await, 2);

        let text = backend.generate(&GenerationRequest::new("hi")).await.unwrap();
        assert_eq!(text, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_model_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/api/generate",
            post(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { (HttpStatus::NOT_FOUND, "model not found") }
            }),
        );
        let backend = backend(serve(router).await, 3);

        let err = backend.generate(&GenerationRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, GenerationError::Model(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_garbage_body_is_invalid_response() {
        let router = Router::new().route("/api/generate", post(|| async { "not json" }));
        let backend = backend(serve(router).await, 0);

        let err = backend.generate(&GenerationRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // port 1 is never bound in the test environment
        let backend = backend("http://127.0.0.1:1".into(), 0);
        let err = backend.generate(&GenerationRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, GenerationError::ServiceUnavailable(_)));
        assert!(!backend.is_available().await);
    }
}
