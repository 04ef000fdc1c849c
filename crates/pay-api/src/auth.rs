//! # Bearer Guard
//!
//! Opaque token check for mutating routes. With no `API_AUTH_TOKEN`
//! configured every guarded request is rejected.

use crate::handlers::ErrorResponse;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use tracing::warn;

/// Middleware for `axum::middleware::from_fn_with_state`
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let Some(expected) = state.config.api_auth_token.as_deref() else {
        warn!("Rejected guarded request: API_AUTH_TOKEN not configured");
        return Err(unauthorized());
    };

    let authorized = bearer_token(request.headers())
        .is_some_and(|presented| constant_time_compare(presented, expected));
    if !authorized {
        warn!(path = %request.uri().path(), "Rejected guarded request: bad or missing token");
        return Err(unauthorized());
    }

    Ok(next.run(request).await)
}

fn unauthorized() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new("Unauthorized", 401)),
    )
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
