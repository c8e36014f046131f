//! Application State
//!
//! Shared state across all handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::watch;

use grounded_qa_agent::{AnswerGroundingEngine, Assistant, ChatSession};
use grounded_qa_config::Settings;
use grounded_qa_llm::{LlmConfig, OllamaBackend};
use grounded_qa_rag::HybridRetriever;
use grounded_qa_text_processing::Guardrails;

use crate::ServerError;

/// A stored session and when a client last touched it
#[derive(Debug, Clone)]
struct SessionSlot {
    session: ChatSession,
    last_activity: Instant,
}

impl SessionSlot {
    fn new(session: ChatSession) -> Self {
        Self {
            session,
            last_activity: Instant::now(),
        }
    }

    fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub assistant: Arc<Assistant>,
    /// Chat sessions by id
    sessions: Arc<RwLock<HashMap<String, SessionSlot>>>,
}

impl AppState {
    pub fn new(config: Settings, assistant: Assistant) -> Self {
        Self {
            config: Arc::new(config),
            assistant: Arc::new(assistant),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Build the full pipeline: index-backed retriever, Ollama generator,
    /// grounding engine and guardrails
    pub fn from_settings(config: Settings) -> Result<Self, ServerError> {
        let retriever = HybridRetriever::from_settings(&config);
        if !retriever.is_ready() {
            tracing::warn!(
                index_dir = %config.paths.index_dir,
                "No corpus index loaded; queries will have no sources"
            );
        }

        let generator = OllamaBackend::new(LlmConfig::from(&config.model))?;
        let engine = AnswerGroundingEngine::new(Arc::new(retriever), Arc::new(generator), &config);
        let assistant = Assistant::new(Arc::new(engine), Guardrails::from_config(&config.guardrails));

        Ok(Self::new(config, assistant))
    }

    fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.config.server.session_timeout_secs)
    }

    /// Register a new session; at capacity, expired sessions are evicted first
    pub fn create_session(&self) -> Result<String, ServerError> {
        let max_sessions = self.config.server.max_sessions;
        let timeout = self.session_timeout();

        let mut sessions = self.sessions.write();
        if sessions.len() >= max_sessions {
            sessions.retain(|_, slot| !slot.is_expired(timeout));
            if sessions.len() >= max_sessions {
                tracing::warn!(max_sessions, "Session limit reached");
                return Err(ServerError::Capacity(max_sessions));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        sessions.insert(id.clone(), SessionSlot::new(ChatSession::new(id.clone())));
        tracing::debug!(session = %id, "Created session");
        Ok(id)
    }

    /// Snapshot of a live session; an expired one is dropped
    pub fn session(&self, id: &str) -> Option<ChatSession> {
        let timeout = self.session_timeout();
        let mut sessions = self.sessions.write();
        match sessions.get_mut(id) {
            Some(slot) if !slot.is_expired(timeout) => {
                slot.last_activity = Instant::now();
                Some(slot.session.clone())
            }
            Some(_) => {
                sessions.remove(id);
                tracing::debug!(session = %id, "Session expired");
                None
            }
            None => None,
        }
    }

    /// Store an updated session; a session deleted meanwhile stays deleted
    pub fn save_session(&self, session: ChatSession) {
        if let Some(slot) = self.sessions.write().get_mut(&session.id) {
            slot.session = session;
            slot.last_activity = Instant::now();
        }
    }

    pub fn remove_session(&self, id: &str) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Drop idle sessions, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let timeout = self.session_timeout();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, slot| !slot.is_expired(timeout));
        before - sessions.len()
    }

    /// Periodically drop idle sessions until the returned sender sends `true`
    pub fn start_cleanup_task(&self) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let state = self.clone();
        let period = Duration::from_secs(self.config.server.session_cleanup_interval_secs.max(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = state.cleanup_expired();
                        if removed > 0 {
                            tracing::info!(
                                removed,
                                remaining = state.session_count(),
                                "Removed expired sessions"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}
