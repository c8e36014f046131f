//! Grounded QA Server
//!
//! HTTP endpoints for one-shot queries and follow-up-aware chat sessions.

pub mod http;
pub mod metrics;
pub mod state;

pub use http::create_router;
pub use metrics::{init_metrics, record_blocked, record_query};
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session not found: {0}")]
    Session(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Query blocked: {0}")]
    Blocked(String),

    #[error("Session limit of {0} reached, try again later")]
    Capacity(usize),

    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::Session(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Blocked(_) => StatusCode::FORBIDDEN,
            ServerError::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Initialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<grounded_qa_llm::LlmError> for ServerError {
    fn from(err: grounded_qa_llm::LlmError) -> Self {
        ServerError::Initialization(err.to_string())
    }
}
