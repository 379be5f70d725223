pub mod admin;
pub mod models;
pub mod redeem;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Assemble the versioned API surface.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api/v1/redeem", redeem::router())
        .nest("/api/v1/admin", admin::router())
}
