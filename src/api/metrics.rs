use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::metrics::{encode_metrics, ConnectionMetrics};
use crate::server::AppState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    ConnectionMetrics::sample(&state.registry.stats());

    match encode_metrics() {
        Ok(body) => ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response(),
        Err(e) => AppError::Internal(format!("Failed to encode metrics: {}", e)).into_response(),
    }
}
