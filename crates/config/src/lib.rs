//! Configuration management for the grounded question-answering pipeline
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default`, `config/{env}`)
//! - Environment variables (`GROUNDED_QA__` prefix, `__` separator)
//!
//! Recoverable problems (alpha outside [0, 1], unknown answer style, zero
//! `top_k`) are repaired by [`Settings::sanitize`] and reported as
//! [`ConfigWarning`]s; only structurally invalid files fail to load.

pub mod constants;
pub mod grounding;
pub mod retrieval;
pub mod settings;

pub use grounding::{GroundingConfig, GuardrailsConfig, PiiConfig};
pub use retrieval::{ModelConfig, RetrievalConfig};
pub use settings::{
    load_settings, load_settings_from_file, ObservabilityConfig, PathsConfig, RuntimeEnvironment,
    ServerConfig, Settings,
};

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for grounded_qa_core::Error {
    fn from(err: ConfigError) -> Self {
        grounded_qa_core::Error::Config(err.to_string())
    }
}

/// A configuration value that was replaced by its documented default
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
}

impl ConfigWarning {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
