//! HTTP API tests against the router with an in-memory pipeline

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use grounded_qa_agent::{AnswerGroundingEngine, Assistant};
use grounded_qa_config::{GuardrailsConfig, Settings};
use grounded_qa_core::{Chunk, Embedder, GenerationError, GenerationRequest, Generator};
use grounded_qa_rag::{Bm25Index, CorpusIndex, FlatVectorIndex, HashingEmbedder, HybridRetriever};
use grounded_qa_server::{create_router, AppState};
use grounded_qa_text_processing::Guardrails;

struct CannedGenerator {
    answer: Result<String, GenerationError>,
}

#[async_trait]
impl Generator for CannedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if request.prompt.ends_with("Follow-up questions:") {
            Ok("1. How many people live in Paris?\n2. What river crosses Paris?".into())
        } else {
            self.answer.clone()
        }
    }

    fn model_name(&self) -> &str {
        "canned"
    }
}

fn app(with_corpus: bool, answer: Result<String, GenerationError>) -> (Router, AppState) {
    app_with(Settings::default(), with_corpus, answer)
}

fn app_with(
    settings: Settings,
    with_corpus: bool,
    answer: Result<String, GenerationError>,
) -> (Router, AppState) {
    let embedder = HashingEmbedder::with_dim(32);
    let corpus = with_corpus.then(|| {
        let chunks = vec![Chunk::new(0, "geo.txt", "Paris is the capital of France.")];
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let dense = FlatVectorIndex::from_vectors(embedder.embed(&texts).unwrap()).unwrap();
        let lexical = Bm25Index::from_texts(&texts);
        CorpusIndex::new(chunks, Box::new(dense), Box::new(lexical)).unwrap()
    });

    let retriever = HybridRetriever::new(corpus, Arc::new(embedder));
    let engine = AnswerGroundingEngine::new(
        Arc::new(retriever),
        Arc::new(CannedGenerator { answer }),
        &settings,
    );
    let guardrails = Guardrails::from_config(&GuardrailsConfig {
        blocked_topics: vec!["weapons".into()],
        ..GuardrailsConfig::default()
    });
    let state = AppState::new(settings, Assistant::new(Arc::new(engine), guardrails));
    (create_router(state.clone()), state)
}

fn grounded_app() -> (Router, AppState) {
    app(true, Ok("Paris is the capital of France. [Source 1]".into()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_query_returns_grounded_result() {
    let (app, _) = grounded_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/query",
        Some(json!({ "question": "What is the capital of France?" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Paris is the capital of France. [Source 1]");
    assert_eq!(body["sources"][0]["id"], 1);
    assert_eq!(body["sources"][0]["title"], "geo.txt");
    assert_eq!(body["evidence_map"][0]["id"], 1);
    assert_eq!(body["evidence_map"][0]["source_title"], "geo.txt");
    assert_eq!(body["uncited_warning"], false);
    assert_eq!(body["has_external_knowledge"], false);
}

#[tokio::test]
async fn test_blocked_query_is_forbidden() {
    let (app, _) = grounded_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/query",
        Some(json!({ "question": "Tell me about WEAPONS" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("This topic is restricted: weapons"));
}

#[tokio::test]
async fn test_empty_question_rejected() {
    let (app, _) = grounded_app();
    let (status, _) = send(&app, "POST", "/api/query", Some(json!({ "question": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generation_failure_is_degraded_not_error() {
    let (app, _) = app(
        true,
        Err(GenerationError::ServiceUnavailable("connection refused".into())),
    );
    let (status, body) = send(
        &app,
        "POST",
        "/api/query",
        Some(json!({ "question": "capital of France" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["answer"].as_str().unwrap().starts_with("❌ LLM error:"));
    assert_eq!(body["sources"], json!([]));
}

#[tokio::test]
async fn test_session_followup_flow() {
    let (app, state) = grounded_app();

    let (status, body) = send(&app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["session_id"].as_str().unwrap().to_string();
    assert_eq!(state.session_count(), 1);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/sessions/{id}/ask"),
        Some(json!({ "input": "capital of France" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "answered");
    assert_eq!(body["followups"][1], "What river crosses Paris?");

    let (status, body) = send(&app, "GET", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["followups"].as_array().unwrap().len(), 2);
    assert_eq!(body["turns"], 1);

    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/sessions/{id}/ask"),
        Some(json!({ "input": "2" })),
    )
    .await;
    assert_eq!(body["question"], "What river crosses Paris?");

    let (status, _) = send(&app, "DELETE", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_limit_returns_unavailable() {
    let mut settings = Settings::default();
    settings.server.max_sessions = 1;
    let (router, state) = app_with(settings, true, Ok("Paris. [Source 1]".into()));

    let (status, _) = send(&router, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&router, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("Session limit of 1"));
    assert_eq!(state.session_count(), 1);
}

#[tokio::test]
async fn test_unknown_session_not_found() {
    let (app, _) = grounded_app();
    let (status, _) = send(
        &app,
        "POST",
        "/api/sessions/missing/ask",
        Some(json!({ "input": "hello there" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_readiness() {
    let (router, _) = grounded_app();
    let (status, body) = send(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&router, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["corpus_size"], 1);

    let (no_corpus, _) = app(false, Ok("unused".into()));
    let (status, body) = send(&no_corpus, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);
}
