//! Admin gate

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::handlers::{ApiError, AppState};

/// Compare without bailing out at the first differing byte
fn tokens_match(given: &[u8], expected: &[u8]) -> bool {
    if given.len() != expected.len() {
        return false;
    }
    given
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// Let a request through only with `Authorization: Bearer <ADMIN_TOKEN>`
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        warn!("Admin request refused: no admin token configured");
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "Admin access is not configured",
        ));
    };

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| tokens_match(token.trim().as_bytes(), expected.as_bytes()));

    if !authorized {
        warn!("Admin request refused: {} {}", request.method(), request.uri().path());
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized"));
    }

    Ok(next.run(request).await)
}
