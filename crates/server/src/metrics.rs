//! Prometheus metrics

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the global Prometheus recorder; later calls reuse the first one
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PROMETHEUS.get_or_try_init(|| PrometheusBuilder::new().install_recorder()) {
        Ok(handle) => Some(handle.clone()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

/// Count a finished query; `outcome` is `answered` or `failed`
pub fn record_query(outcome: &'static str, elapsed: Duration) {
    metrics::counter!("grounded_qa_queries_total", "outcome" => outcome).increment(1);
    metrics::histogram!("grounded_qa_query_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_blocked() {
    metrics::counter!("grounded_qa_queries_total", "outcome" => "blocked").increment(1);
}

pub fn record_session_created() {
    metrics::counter!("grounded_qa_sessions_created_total").increment(1);
}

pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}
