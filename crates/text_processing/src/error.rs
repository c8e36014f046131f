//! Error types for text processing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextProcessingError {
    #[error("Rules file not found: {0}")]
    RulesNotFound(String),

    #[error("Invalid rules: {0}")]
    InvalidRules(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for TextProcessingError {
    fn from(err: serde_yaml::Error) -> Self {
        TextProcessingError::InvalidRules(err.to_string())
    }
}

impl From<TextProcessingError> for grounded_qa_core::Error {
    fn from(err: TextProcessingError) -> Self {
        grounded_qa_core::Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TextProcessingError>;
