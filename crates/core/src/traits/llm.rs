//! Generation trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::GenerationError;

/// A single completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: 256,
            temperature: 0.2,
            top_p: 0.9,
            repeat_penalty: 1.1,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Generative model
///
/// Implementations:
/// - `OllamaBackend` - local Ollama server
///
/// # Example
///
/// ```ignore
/// let generator: Arc<dyn Generator> = Arc::new(OllamaBackend::new(config)?);
/// let text = generator.generate(&GenerationRequest::new("Say hi")).await?;
/// ```
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Model name for logging
    fn model_name(&self) -> &str;
}
