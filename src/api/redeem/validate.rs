// ============================================================================
// VALIDATE ENDPOINT - Canje del token (primer escaneo gana)
// ============================================================================

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::ApiError;
use crate::domains::redeem::RedemptionOutcome;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub success: bool,
    pub redemption: RedemptionOutcome,
}

/// Redeem a token: mark it used, exactly once.
///
/// # Endpoint
/// POST /api/v1/redeem/validate
///
/// # Authentication
/// None. Possession of the token string is the credential; ownership and
/// expiry are not checked on this path.
///
/// # Request Body
/// ```json
/// { "token": "aBcD...32 chars...XyZ" }
/// ```
///
/// # Returns
/// - 200 OK: this call won the redemption
/// - 404 Not Found: unknown token
/// - 409 Conflict: already used (body carries `"already_used": true`)
pub async fn validate_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let outcome = state.redeem_service.redeem(&payload.token).await?;

    info!(
        token_id = outcome.token.id,
        user_id = outcome.token.user_id,
        "Redemption validated"
    );

    Ok(Json(ValidateResponse {
        success: true,
        redemption: outcome,
    }))
}
