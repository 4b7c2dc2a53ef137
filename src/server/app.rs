use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api::api_routes;
use crate::websocket::ws_handler;

use super::AppState;

/// Build the full router: the `/ws` endpoint for clients plus the HTTP API.
pub fn create_app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer());

    Router::new()
        .route("/ws", get(ws_handler))
        .merge(api_routes(&state))
        .layer(middleware)
        .with_state(state)
}

/// Browser clients connect from the web app's own origin
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
