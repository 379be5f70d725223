//! Modelos del sistema de tokens de redención

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ======================================================================
// TIPOS DE REDENCIÓN
// ======================================================================

/// Kind of promotion a token redeems. The string forms are the values
/// stored in the `redeem_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RedeemType {
    OneSpecial,
    MonthlySpecial,
}

impl RedeemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedeemType::OneSpecial => "oneSpecial",
            RedeemType::MonthlySpecial => "monthlySpecial",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "oneSpecial" => Some(RedeemType::OneSpecial),
            "monthlySpecial" => Some(RedeemType::MonthlySpecial),
            _ => None,
        }
    }
}

// ======================================================================
// TOKENS
// ======================================================================

/// A single-use redemption token binding a user to a business promotion.
#[derive(Debug, Clone, Serialize)]
pub struct RedeemToken {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
    pub business_id: i64,
    pub redeem_type: RedeemType,
    pub month_index: Option<i32>,
    pub month_data: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
    pub uid: Uuid,
}

impl RedeemToken {
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    pub fn is_valid(&self) -> bool {
        !self.is_used() && !self.is_expired()
    }

    /// Parse the stored `month|special` payload of a monthly-special token.
    /// Only the first pipe separates; the special text may contain more.
    pub fn month_special(&self) -> Option<MonthSpecial> {
        let data = self.month_data.as_deref()?;
        let mut parts = data.splitn(2, '|');
        let month = parts.next()?.to_string();
        let special = parts.next().unwrap_or("").to_string();
        Some(MonthSpecial { month, special })
    }
}

/// Display form of a monthly special, split out of `month_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthSpecial {
    pub month: String,
    pub special: String,
}

/// Insert payload for the token store. Timestamps, id and uid are assigned
/// by the store.
#[derive(Debug, Clone)]
pub struct NewRedeemToken {
    pub token: String,
    pub user_id: i64,
    pub business_id: i64,
    pub redeem_type: RedeemType,
    pub month_index: Option<i32>,
    pub month_data: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Status filter for per-user counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFilter {
    All,
    Used,
    Active,
}

/// Aggregate token counts for one user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserTokenCounts {
    pub user_id: i64,
    pub total: i64,
    pub used: i64,
    pub active: i64,
}

// ======================================================================
// ERRORES
// ======================================================================

#[derive(Debug, thiserror::Error)]
pub enum RedeemError {
    #[error("{0}")]
    Validation(String),
    #[error("Redemption not found")]
    NotFound,
    #[error("Associated business not found")]
    BusinessNotFound,
    #[error("You are not allowed to view this redemption")]
    Unauthorized,
    #[error("This redemption has expired")]
    Expired,
    #[error("This redemption has already been used")]
    AlreadyUsed,
    #[error("Storage error: {0}")]
    Storage(String),
}
