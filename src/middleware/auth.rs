use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{error, info, warn};

use crate::api::models::ErrorResponse;

/// JWT Claims structure matching the token payload
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub sub: String, // user_id as string
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: Option<String>,
}

/// Current user data extracted from JWT
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub email: String,
    pub token: String,
}

pub const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

fn get_jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| "redeem_ws_dev_secret_change_me".to_string())
}

type AuthRejection = (StatusCode, Json<ErrorResponse>);

fn unauthorized(error: &str, message: &str) -> AuthRejection {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
            details: None,
        }),
    )
}

/// Middleware: validate the bearer JWT and stash a `CurrentUser` in the
/// request extensions for handlers behind it.
pub async fn extract_current_user(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let current_user = extract_user_from_headers(&headers)?;

    info!(
        user_id = current_user.user_id,
        email = %current_user.email,
        "🔐 JWT authentication successful"
    );

    request.extensions_mut().insert(current_user);
    Ok(next.run(request).await)
}

/// Extract user from headers directly. Used by handlers where
/// authentication is optional and a failure must not reject the request.
pub fn extract_user_from_headers(headers: &HeaderMap) -> Result<CurrentUser, AuthRejection> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header");
            unauthorized(
                "Missing Authorization header",
                "Authentication required. Please provide a valid Bearer token.",
            )
        })?;

    if !auth_header.starts_with("Bearer ") {
        warn!("Invalid Authorization header format");
        return Err(unauthorized(
            "Invalid Authorization header format",
            "Authorization header must be in format: Bearer <token>",
        ));
    }

    let token = auth_header.trim_start_matches("Bearer ").trim();
    if token.is_empty() {
        warn!("Empty JWT token");
        return Err(unauthorized(
            "Empty JWT token",
            "Please provide a valid JWT token.",
        ));
    }

    let claims = verify_jwt_token(token).map_err(|e| {
        warn!("JWT validation failed: {}", e);
        unauthorized(
            "Invalid or expired token",
            "Could not validate credentials. Please log in again.",
        )
    })?;

    let user_id = claims.sub.parse::<i64>().map_err(|_| {
        error!("Invalid user_id in JWT sub field: {}", claims.sub);
        unauthorized("Invalid token", "Invalid user ID format in token")
    })?;

    Ok(CurrentUser {
        user_id,
        email: claims.email,
        token: token.to_string(),
    })
}

/// Decode and validate a JWT, returning its claims.
pub fn verify_jwt_token(token: &str) -> Result<JwtClaims, String> {
    let jwt_secret = get_jwt_secret();
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let validation = Validation::new(JWT_ALGORITHM);

    decode::<JwtClaims>(token, &decoding_key, &validation)
        .map(|token_data| token_data.claims)
        .map_err(|e| format!("JWT validation failed: {}", e))
}
