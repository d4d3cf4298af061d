// HTTP routers: public query API and admin/metrics, served on separate listeners

mod admin;
mod api;

use axum::{Router, routing::get};
use prometheus::Registry;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::query::QueryService;

pub fn public_app(service: Arc<QueryService>) -> Router {
    Router::new()
        .route("/api/v1/sources", get(api::list_sources))
        .route("/api/v1/sources/{source}/servers", get(api::list_servers))
        .route(
            "/api/v1/sources/{source}/servers/{host}",
            get(api::get_server),
        )
        .route(
            "/api/v1/sources/{source}/servers/{host}/statistics",
            get(api::server_statistics),
        )
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(service)
}

pub fn admin_app(registry: Registry) -> Router {
    Router::new()
        .route("/health", get(admin::health_handler))
        .route("/version", get(admin::version_handler))
        .route("/metrics", get(admin::metrics_handler))
        .with_state(registry)
}
