use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::{api_key_auth, AppState};
use crate::triggers::{emit_event, emit_task_shared};

use super::health::{health, stats};
use super::metrics::prometheus_metrics;

pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Health, Stats & Metrics
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Event ingress for the task API
        .nest(
            "/api/v1",
            Router::new()
                .route("/events", post(emit_event))
                .route("/events/task-shared", post(emit_task_shared))
                .route_layer(middleware::from_fn_with_state(state.clone(), api_key_auth)),
        )
}
