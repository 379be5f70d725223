// ============================================================================
// HISTORY ENDPOINT - Historial de redenciones del usuario
// ============================================================================

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use std::sync::Arc;

use super::ApiError;
use crate::domains::redeem::HistoryEntry;
use crate::middleware::auth::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub count: usize,
    pub history: Vec<HistoryEntry>,
}

/// List the caller's redemption tokens, newest first.
///
/// # Endpoint
/// GET /api/v1/redeem/history
///
/// # Authentication
/// Requires valid JWT token
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state
        .redeem_service
        .list_history(current_user.user_id)
        .await?;

    Ok(Json(HistoryResponse {
        success: true,
        count: history.len(),
        history,
    }))
}
