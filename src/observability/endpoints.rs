use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

use crate::state::AppState;

/// Router with the unauthenticated operational endpoints.
pub fn observability_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

/// Basic health check endpoint
async fn health_check() -> impl IntoResponse {
    let health = serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "redeem_ws"
    });

    (StatusCode::OK, axum::Json(health))
}

/// Handler para el endpoint /metrics de Prometheus
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}

/// Readiness: verifies storage is reachable. Memory-store runs have no
/// external dependency and report ready unconditionally.
async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.config.use_memory_store {
        return (StatusCode::OK, "ready").into_response();
    }

    match sqlx::query("SELECT 1").execute(&state.db_pool).await {
        Ok(_) => (StatusCode::OK, "ready").into_response(),
        Err(e) => {
            tracing::error!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable").into_response()
        }
    }
}

async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, "alive")
}
