//! Operational HTTP endpoints.
//!
//! - `/healthz`         : liveness
//! - `/readyz`          : readiness (503 when draining)
//! - scrape path        : Prometheus text format (default `/metrics`)

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use promscope_core::exposition::TextEncoder;

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    }
}

/// Snapshot the registry and encode it. Read-only: abandoning the request
/// at any point leaves metric state untouched.
pub async fn metrics(State(state): State<AppState>) -> Response {
    let encoder = TextEncoder::new();
    let snapshot = state.registry().snapshot();

    match encoder.encode(&snapshot) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "scrape encode failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
