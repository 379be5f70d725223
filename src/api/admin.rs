// ============================================================================
// ADMIN API - Reportes y mantenimiento de tokens
// ============================================================================

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

use crate::domains::redeem::{RedeemError, UserTokenSummary};
use crate::middleware::{extract_current_user, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/redemptions", get(per_user_summary))
        .route("/clear-history", post(clear_history))
        .layer(from_fn(extract_current_user))
}

/// Check if a user has admin privileges via the ADMIN_USER_IDS env var
/// (comma-separated user ids).
fn is_admin(user_id: i64) -> bool {
    let admin_ids = std::env::var("ADMIN_USER_IDS").unwrap_or_else(|_| "1".to_string());
    admin_ids
        .split(',')
        .filter_map(|id| id.trim().parse::<i64>().ok())
        .any(|id| id == user_id)
}

fn require_admin(current_user: &CurrentUser) -> Result<(), ApiError> {
    if !is_admin(current_user.user_id) {
        warn!(
            user_id = current_user.user_id,
            "Admin endpoint rejected non-admin user"
        );
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub report: Vec<UserTokenSummary>,
}

/// Per-user token counts (total / used / active).
///
/// # Endpoint
/// GET /api/v1/admin/redemptions
///
/// # Authentication
/// Requires valid JWT token + admin user id
pub async fn per_user_summary(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<SummaryResponse>, ApiError> {
    require_admin(&current_user)?;

    let report = state.admin_service.per_user_summary().await.map_err(|e| {
        error!("Failed to build redemption summary: {:?}", e);
        ApiError::from(e)
    })?;

    Ok(Json(SummaryResponse {
        success: true,
        report,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ClearHistoryRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ClearHistoryResponse {
    pub success: bool,
    pub deleted: u64,
}

/// Delete all of a user's tokens. Irreversible.
///
/// # Endpoint
/// POST /api/v1/admin/clear-history
///
/// # Authentication
/// Requires valid JWT token + admin user id
pub async fn clear_history(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<ClearHistoryRequest>,
) -> Result<Json<ClearHistoryResponse>, ApiError> {
    require_admin(&current_user)?;

    let deleted = state
        .admin_service
        .clear_history(payload.user_id)
        .await
        .map_err(|e| {
            error!("Failed to clear history: {:?}", e);
            ApiError::from(e)
        })?;

    Ok(Json(ClearHistoryResponse {
        success: true,
        deleted,
    }))
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Forbidden(String),
    InternalError(String),
}

impl From<RedeemError> for ApiError {
    fn from(err: RedeemError) -> Self {
        match err {
            RedeemError::Storage(msg) => {
                // Infrastructure detail stays in the logs.
                error!("Storage error: {}", msg);
                ApiError::InternalError("Internal server error".to_string())
            }
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}
