pub mod endpoints;
pub mod metrics;

pub use endpoints::{metrics_handler, observability_router};
pub use metrics::init_metrics;

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Captures request count and latency for every route.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    metrics::record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
