use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::api::AppState;
use crate::utils::error::AppError;

/// Guards the sweep trigger with the configured bearer token. Open when no token is configured.
pub async fn cleanup_auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.cleanup_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized("Missing or invalid authorization header".to_string())
        })?;

    if !tokens_match(token, expected) {
        return Err(AppError::Unauthorized("Invalid cleanup token".to_string()));
    }

    Ok(next.run(request).await)
}

/// Compares digests so the time taken does not depend on how much of the secret matched.
fn tokens_match(given: &str, expected: &str) -> bool {
    Sha256::digest(given.as_bytes()) == Sha256::digest(expected.as_bytes())
}
