// ============================================================================
// REDEEM API MODULE - Tokens de redención de un solo uso
// ============================================================================

pub mod history;
pub mod tokens;
pub mod validate;
pub mod view;

use axum::{
    http::StatusCode,
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::domains::redeem::RedeemError;
use crate::middleware::extract_current_user;
use crate::state::AppState;

/// Routes for issuing, viewing and redeeming tokens.
///
/// The scan-path endpoints (view, qr, validate) take no mandatory auth; the
/// engine's expiry policy decides whether a viewer identity is required.
pub fn router() -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/tokens", post(tokens::issue_token))
        .route("/history", get(history::list_history))
        .layer(from_fn(extract_current_user));

    let public = Router::new()
        .route("/view", get(view::view_token))
        .route("/qr", get(view::qr_image))
        .route("/validate", post(validate::validate_token));

    protected.merge(public)
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// API Error wrapper for HTTP responses
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    /// Benign terminal state of a token, rendered distinctly so scanners
    /// can show "already redeemed" rather than a generic failure.
    AlreadyUsed(String),
    Gone(String),
    InternalError(String),
}

impl From<RedeemError> for ApiError {
    fn from(err: RedeemError) -> Self {
        match err {
            RedeemError::Validation(msg) => ApiError::BadRequest(msg),
            RedeemError::NotFound => ApiError::NotFound("Redemption not found".to_string()),
            RedeemError::BusinessNotFound => {
                ApiError::NotFound("Associated business not found".to_string())
            }
            RedeemError::Unauthorized => {
                ApiError::Unauthorized("You are not allowed to view this redemption".to_string())
            }
            RedeemError::Expired => ApiError::Gone("This redemption has expired".to_string()),
            RedeemError::AlreadyUsed => {
                ApiError::AlreadyUsed("This redemption has already been used".to_string())
            }
            RedeemError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                ApiError::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, already_used) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, false),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, false),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, false),
            ApiError::AlreadyUsed(msg) => (StatusCode::CONFLICT, msg, true),
            ApiError::Gone(msg) => (StatusCode::GONE, msg, false),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, false),
        };

        let body = if already_used {
            Json(serde_json::json!({
                "success": false,
                "error": message,
                "already_used": true,
            }))
        } else {
            Json(serde_json::json!({
                "success": false,
                "error": message,
            }))
        };

        (status, body).into_response()
    }
}
