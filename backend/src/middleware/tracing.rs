//! Request tracing middleware

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use super::ACTOR_HEADER;

/// Log each request with its actor, status and timing
pub async fn request_tracing(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let actor = request
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_string());

    let start = Instant::now();
    tracing::debug!(method = %method, path = %path, actor = ?actor, "Request started");

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        tracing::error!(method = %method, path = %path, actor = ?actor, status, duration_ms, "Request failed");
    } else if response.status().is_client_error() {
        tracing::warn!(method = %method, path = %path, actor = ?actor, status, duration_ms, "Request refused");
    } else {
        tracing::info!(method = %method, path = %path, actor = ?actor, status, duration_ms, "Request completed");
    }

    response
}
