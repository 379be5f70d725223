use axum::{
    http::Method,
    middleware as axum_middleware,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::{predicate::SizeAbove, CompressionLayer};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod db;
pub mod domains;
pub mod middleware;
pub mod observability;
pub mod services;
pub mod state;

use api::create_api_router;
use observability::{metrics_middleware, observability_router};
use state::AppState;

pub fn create_app_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        // Operational endpoints (no auth) - includes Prometheus /metrics
        .merge(observability_router())
        // API endpoints
        .merge(create_api_router())
        .with_state(app_state)
        .layer(axum_middleware::from_fn(metrics_middleware))
        .layer(
            CompressionLayer::new()
                .gzip(true)
                .deflate(true)
                .compress_when(SizeAbove::new(1024)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600))
}
