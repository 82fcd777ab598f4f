//! `x-api-key` header validation (§6: simpler than a JWKS-backed scheme,
//! since this boundary has no end-user identity to authenticate).

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::state::AppState;

const API_KEY_HEADER: &str = "x-api-key";

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if state.config.api_keys.is_empty() {
        return Ok(next.run(request).await);
    }

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if state.config.api_keys.iter().any(|k| k == key) => Ok(next.run(request).await),
        _ => Err(ApiError::Unauthorized),
    }
}
