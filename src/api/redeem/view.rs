// ============================================================================
// REDEMPTION VIEW ENDPOINTS - QR landing page data + QR image
// ============================================================================

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::ApiError;
use crate::domains::redeem::TokenView;
use crate::middleware::extract_user_from_headers;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ViewParams {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub success: bool,
    pub redemption: TokenView,
}

/// Show a redemption to whoever scanned its QR code.
///
/// # Endpoint
/// GET /api/v1/redeem/view?token=...
///
/// # Authentication
/// Optional. Under the owner-gated policy an anonymous or non-owner viewer
/// is rejected; under the open policy the token string is enough.
///
/// # Returns
/// - 200 OK: redemption details
/// - 401 Unauthorized: owner-gated policy and viewer is not the owner
/// - 404 Not Found: unknown token or business no longer resolves
/// - 409 Conflict: already used
/// - 410 Gone: expired (owner-gated policy only)
pub async fn view_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ViewParams>,
) -> Result<Json<ViewResponse>, ApiError> {
    let viewer = extract_user_from_headers(&headers)
        .ok()
        .map(|user| user.user_id);

    let view = state
        .redeem_service
        .get_for_view(&params.token, viewer)
        .await?;

    Ok(Json(ViewResponse {
        success: true,
        redemption: view,
    }))
}

/// PNG of the QR code pointing at a token's view URL.
///
/// # Endpoint
/// GET /api/v1/redeem/qr?token=...
///
/// Gated exactly like the view endpoint, so a QR can only be fetched for a
/// token its holder could open.
pub async fn qr_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ViewParams>,
) -> Result<Response, ApiError> {
    let viewer = extract_user_from_headers(&headers)
        .ok()
        .map(|user| user.user_id);

    // View gating doubles as the QR gate.
    state
        .redeem_service
        .get_for_view(&params.token, viewer)
        .await?;

    let png = state
        .qr
        .render_png(&params.token)
        .map_err(|e| ApiError::InternalError(format!("QR rendering failed: {}", e)))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/png")],
        png,
    )
        .into_response())
}
