// Admin surface: liveness, build identity and collector metrics.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use prometheus::{Registry, TEXT_FORMAT, TextEncoder};

use crate::version::{NAME, VERSION};

/// GET /health
pub(super) async fn health_handler() -> &'static str {
    "ok"
}

/// GET /version: service name and version from Cargo.toml at build time.
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /metrics in the Prometheus text exposition format.
pub(super) async fn metrics_handler(State(registry): State<Registry>) -> Response {
    let mut buffer = String::new();
    match TextEncoder::new().encode_utf8(&registry.gather(), &mut buffer) {
        Ok(()) => ([(header::CONTENT_TYPE, TEXT_FORMAT)], buffer).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, operation = "encode_metrics", "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
