use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{NewRedeemToken, RedeemToken, RedeemType, TokenFilter, UserTokenCounts};

// ============================================================================
// STORE ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The token string already exists. Callers regenerate and retry.
    #[error("Token string already exists")]
    DuplicateToken,
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // 23505 = unique_violation
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::DuplicateToken;
            }
        }
        StoreError::Database(err.to_string())
    }
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Persistence for redemption tokens.
///
/// Implementations must provide two atomic primitives: `insert` rejects a
/// duplicate token string without a prior read, and `mark_used_if_unused`
/// performs the conditional state transition in a single step. Everything
/// race-sensitive in the engine reduces to these two calls.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a new token. `DuplicateToken` if the token string is taken.
    async fn insert(&self, new_token: NewRedeemToken) -> Result<RedeemToken, StoreError>;

    /// Exact lookup by token string. No ownership filtering at this layer.
    async fn find_by_token(&self, token: &str) -> Result<Option<RedeemToken>, StoreError>;

    /// Set `used_at` iff it is still null. Returns whether this call won.
    /// `date_updated` is refreshed with the store's own write clock, not
    /// the caller-supplied instant.
    async fn mark_used_if_unused(
        &self,
        token: &str,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// All tokens of a user, newest first.
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<RedeemToken>, StoreError>;

    async fn count_for_user(&self, user_id: i64, filter: TokenFilter)
        -> Result<i64, StoreError>;

    /// Delete every token of a user. Returns the number of rows removed.
    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError>;

    /// Token counts grouped by user, for the admin report. One row per user
    /// that has at least one token, ordered by total descending.
    async fn summarize_by_user(&self) -> Result<Vec<UserTokenCounts>, StoreError>;
}

// ============================================================================
// POSTGRES IMPLEMENTATION
// ============================================================================

pub struct PgTokenStore {
    db: PgPool,
}

impl PgTokenStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const TOKEN_COLUMNS: &str = "id, token, user_id, business_id, redeem_type, month_index, \
     month_data, expires_at, used_at, date_created, date_updated, uid";

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn insert(&self, new_token: NewRedeemToken) -> Result<RedeemToken, StoreError> {
        let query = format!(
            r#"
            INSERT INTO redeem_tokens
                (token, user_id, business_id, redeem_type, month_index, month_data,
                 expires_at, used_at, date_created, date_updated, uid)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, NOW(), NOW(), $8)
            RETURNING {TOKEN_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, TokenRow>(&query)
            .bind(&new_token.token)
            .bind(new_token.user_id)
            .bind(new_token.business_id)
            .bind(new_token.redeem_type.as_str())
            .bind(new_token.month_index)
            .bind(&new_token.month_data)
            .bind(new_token.expires_at)
            .bind(Uuid::new_v4())
            .fetch_one(&self.db)
            .await?;

        row.into_token()
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RedeemToken>, StoreError> {
        let query = format!("SELECT {TOKEN_COLUMNS} FROM redeem_tokens WHERE token = $1");

        let row = sqlx::query_as::<_, TokenRow>(&query)
            .bind(token)
            .fetch_optional(&self.db)
            .await?;

        row.map(TokenRow::into_token).transpose()
    }

    async fn mark_used_if_unused(
        &self,
        token: &str,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        // Single conditional UPDATE. Under concurrent calls exactly one
        // statement matches the `used_at IS NULL` predicate.
        let result = sqlx::query(
            r#"
            UPDATE redeem_tokens
            SET used_at = $2, date_updated = NOW()
            WHERE token = $1 AND used_at IS NULL
            "#,
        )
        .bind(token)
        .bind(used_at)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<RedeemToken>, StoreError> {
        let query = format!(
            "SELECT {TOKEN_COLUMNS} FROM redeem_tokens \
             WHERE user_id = $1 ORDER BY date_created DESC, id DESC"
        );

        let rows = sqlx::query_as::<_, TokenRow>(&query)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(TokenRow::into_token).collect()
    }

    async fn count_for_user(
        &self,
        user_id: i64,
        filter: TokenFilter,
    ) -> Result<i64, StoreError> {
        let query = match filter {
            TokenFilter::All => "SELECT COUNT(*) FROM redeem_tokens WHERE user_id = $1",
            TokenFilter::Used => {
                "SELECT COUNT(*) FROM redeem_tokens WHERE user_id = $1 AND used_at IS NOT NULL"
            }
            TokenFilter::Active => {
                "SELECT COUNT(*) FROM redeem_tokens \
                 WHERE user_id = $1 AND used_at IS NULL AND expires_at > NOW()"
            }
        };

        let count: i64 = sqlx::query_scalar(query)
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }

    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM redeem_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    async fn summarize_by_user(&self) -> Result<Vec<UserTokenCounts>, StoreError> {
        let counts = sqlx::query_as::<_, UserTokenCounts>(
            r#"
            SELECT
                user_id,
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE used_at IS NOT NULL) AS used,
                COUNT(*) FILTER (WHERE used_at IS NULL AND expires_at > NOW()) AS active
            FROM redeem_tokens
            GROUP BY user_id
            ORDER BY total DESC, user_id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(counts)
    }
}

// Struct auxiliar para queries
#[derive(sqlx::FromRow)]
struct TokenRow {
    id: i64,
    token: String,
    user_id: i64,
    business_id: i64,
    redeem_type: String,
    month_index: Option<i32>,
    month_data: Option<String>,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    date_created: DateTime<Utc>,
    date_updated: DateTime<Utc>,
    uid: Uuid,
}

impl TokenRow {
    fn into_token(self) -> Result<RedeemToken, StoreError> {
        let redeem_type = RedeemType::parse(&self.redeem_type).ok_or_else(|| {
            StoreError::Database(format!("unknown redeem_type '{}'", self.redeem_type))
        })?;

        Ok(RedeemToken {
            id: self.id,
            token: self.token,
            user_id: self.user_id,
            business_id: self.business_id,
            redeem_type,
            month_index: self.month_index,
            month_data: self.month_data,
            expires_at: self.expires_at,
            used_at: self.used_at,
            date_created: self.date_created,
            date_updated: self.date_updated,
            uid: self.uid,
        })
    }
}
