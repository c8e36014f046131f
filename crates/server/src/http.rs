//! HTTP Endpoints
//!
//! REST API for grounded question answering.

use std::time::Instant;

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use grounded_qa_agent::{AskOptions, Reply};
use grounded_qa_core::QueryResult;

use crate::metrics::{metrics_handler, record_blocked, record_query, record_session_created};
use crate::state::AppState;
use crate::ServerError;

const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.config.server.cors_origins,
        state.config.server.cors_enabled,
    );

    Router::new()
        .route("/api/query", post(query))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/ask", post(ask))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// - CORS disabled: permissive layer
/// - no valid origins configured: localhost:3000 only
/// - otherwise the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let mut parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();
    if parsed.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to {}", DEFAULT_ORIGIN);
        parsed.push(HeaderValue::from_static(DEFAULT_ORIGIN));
    }

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub explain: Option<bool>,
    #[serde(default)]
    pub followups: Option<bool>,
}

/// One-shot grounded query
async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResult>, ServerError> {
    let question = non_empty(&request.question, "question")?;
    let options = AskOptions {
        style: request.style,
        explain: request.explain,
        followups: request.followups,
    };

    let started = Instant::now();
    match state.assistant.answer(question, &options).await {
        Reply::Blocked { reason } => {
            record_blocked();
            Err(ServerError::Blocked(reason))
        }
        Reply::Answered { result, .. } => {
            record_outcome(&result, started);
            Ok(Json(result))
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionCreated {
    session_id: String,
}

async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionCreated>), ServerError> {
    let session_id = state.create_session()?;
    record_session_created();
    Ok((StatusCode::CREATED, Json(SessionCreated { session_id })))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<grounded_qa_agent::ChatSession>, ServerError> {
    state
        .session(&id)
        .map(Json)
        .ok_or(ServerError::Session(id))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.remove_session(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    /// A new question or the number of a suggested follow-up
    pub input: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub explain: Option<bool>,
    #[serde(default)]
    pub followups: Option<bool>,
}

/// One chat turn
///
/// The session is snapshotted, answered outside the lock and written back;
/// concurrent turns on one session keep the last writer's follow-ups.
async fn ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AskRequest>,
) -> Result<Json<Reply>, ServerError> {
    let input = non_empty(&request.input, "input")?;
    let mut session = state.session(&id).ok_or_else(|| ServerError::Session(id.clone()))?;
    let options = AskOptions {
        style: request.style,
        explain: request.explain,
        followups: request.followups,
    };

    let started = Instant::now();
    let reply = state.assistant.ask(&mut session, input, &options).await;
    match reply.result() {
        Some(result) => record_outcome(result, started),
        None => record_blocked(),
    }

    state.save_session(session);
    Ok(Json(reply))
}

fn record_outcome(result: &QueryResult, started: Instant) {
    let outcome = if result.is_failure() { "failed" } else { "answered" };
    record_query(outcome, started.elapsed());
}

fn non_empty<'a>(value: &'a str, field: &str) -> Result<&'a str, ServerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServerError::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(trimmed)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Ready once a corpus index is loaded
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let retriever = state.assistant.engine().retriever();
    let ready = retriever.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "ready": ready,
            "corpus_size": retriever.corpus_size(),
            "reranking": retriever.reranking_enabled(),
            "model": state.assistant.engine().model_name(),
            "sessions": state.session_count(),
        })),
    )
}
