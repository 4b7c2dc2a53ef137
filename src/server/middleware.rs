use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use super::AppState;
use crate::error::AppError;

/// Header carrying the shared secret for the event ingress
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Guards the event ingress with `api.key`. Open when no key is configured.
pub async fn api_key_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    verify_api_key(state.settings.api.key.as_deref(), req.headers())?;
    Ok(next.run(req).await)
}

fn verify_api_key(expected: Option<&str>, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match headers.get(API_KEY_HEADER).map(|v| v.to_str()) {
        Some(Ok(key)) if key == expected => Ok(()),
        Some(_) => Err(AppError::Auth("Invalid API key".to_string())),
        None => Err(AppError::Auth(format!("Missing {} header", API_KEY_HEADER))),
    }
}
