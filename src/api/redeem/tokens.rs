// ============================================================================
// TOKEN ISSUE ENDPOINT
// ============================================================================

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use validator::Validate;

use super::ApiError;
use crate::domains::redeem::{IssueTokenRequest, RedeemToken, RedeemType};
use crate::middleware::auth::CurrentUser;
use crate::state::AppState;

/// Request body for issuing a redemption token
#[derive(Debug, Deserialize, Validate)]
pub struct IssueTokenPayload {
    pub business_id: i64,
    pub redeem_type: RedeemType,
    #[validate(range(min = 0, max = 11, message = "monthIndex must be between 0 and 11"))]
    pub month_index: Option<i32>,
    pub month_data: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IssueTokenResponse {
    pub success: bool,
    pub token: RedeemToken,
    /// URL carried by the QR code for this token.
    pub validation_url: String,
}

/// Issue a new single-use redemption token for the authenticated user.
///
/// # Endpoint
/// POST /api/v1/redeem/tokens
///
/// # Authentication
/// Requires valid JWT token
///
/// # Request Body
/// ```json
/// {
///   "business_id": 7,
///   "redeem_type": "monthlySpecial",
///   "month_index": 3,
///   "month_data": "April|2x1 pizza"
/// }
/// ```
///
/// # Returns
/// - 201 Created: token issued
/// - 400 Bad Request: unknown business, bad month fields
/// - 401 Unauthorized: invalid token
/// - 500 Internal Server Error: storage failure
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<IssueTokenPayload>,
) -> Result<(StatusCode, Json<IssueTokenResponse>), ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    info!(
        "Issuing redemption token for user_id={} business_id={}",
        current_user.user_id, payload.business_id
    );

    let request = IssueTokenRequest {
        user_id: current_user.user_id,
        business_id: payload.business_id,
        redeem_type: payload.redeem_type,
        month_index: payload.month_index,
        month_data: payload.month_data,
    };

    let token = state.redeem_service.issue_token(request).await.map_err(|e| {
        error!("Failed to issue token: {:?}", e);
        ApiError::from(e)
    })?;

    let validation_url = state
        .qr
        .validation_url(&token.token)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(IssueTokenResponse {
            success: true,
            token,
            validation_url,
        }),
    ))
}
