use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::errors::AppError;
use crate::handlers::AppState;

/// Alternative header for clients that cannot send `Authorization`.
pub const TOKEN_HEADER: &str = "X-Api-Token";

/// Middleware guarding `/api/*` with the configured `API_TOKEN`.
///
/// Accepts `Authorization: Bearer <token>` or `X-Api-Token: <token>`.
/// Does nothing when no token is configured.
pub async fn require_api_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(ref expected) = state.config.api_token {
        validate_token(request.headers(), expected)?;
    }
    Ok(next.run(request).await)
}

/// Checks the request headers against `expected`.
pub fn validate_token(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let token = extract_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Missing API token".to_string()))?;

    if !constant_time_compare(token, expected) {
        return Err(AppError::Unauthorized("Invalid API token".to_string()));
    }

    Ok(())
}

fn extract_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.trim());
        }
    }
    headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
