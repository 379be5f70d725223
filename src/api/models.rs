use serde::{Deserialize, Serialize};

/// Error body returned by authentication failures and other non-domain
/// rejections.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
