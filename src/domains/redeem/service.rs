use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use super::generator::TokenGenerator;
use super::models::{
    MonthSpecial, NewRedeemToken, RedeemError, RedeemToken, RedeemType,
};
use super::store::{StoreError, TokenStore};
use crate::config::ExpiryPolicy;
use crate::observability::metrics::{
    record_redemption, record_token_collision, record_token_issued,
};
use crate::services::directory::{
    Business, BusinessDirectory, DirectoryError, UserDirectory, UserProfile,
};

/// Attempts before giving up on generating a non-colliding token string.
const MAX_TOKEN_ATTEMPTS: u32 = 3;

impl From<StoreError> for RedeemError {
    fn from(err: StoreError) -> Self {
        match err {
            // Collisions are retried inside the engine; one escaping here
            // means the retry budget ran out.
            StoreError::DuplicateToken => {
                RedeemError::Storage("could not generate a unique token".to_string())
            }
            StoreError::Database(msg) => RedeemError::Storage(msg),
        }
    }
}

impl From<DirectoryError> for RedeemError {
    fn from(err: DirectoryError) -> Self {
        let DirectoryError::Database(msg) = err;
        RedeemError::Storage(msg)
    }
}

#[derive(Debug, Clone)]
pub struct IssueTokenRequest {
    pub user_id: i64,
    pub business_id: i64,
    pub redeem_type: RedeemType,
    pub month_index: Option<i32>,
    pub month_data: Option<String>,
}

/// Data for the redemption view page (the QR landing target).
#[derive(Debug, Clone, serde::Serialize)]
pub struct TokenView {
    pub token: RedeemToken,
    pub business: Business,
    pub month_special: Option<MonthSpecial>,
}

/// Result of a winning redemption.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RedemptionOutcome {
    pub token: RedeemToken,
    pub business: Option<Business>,
    pub user: Option<UserProfile>,
    pub redeemed_at: DateTime<Utc>,
}

/// One row of a user's redemption history.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HistoryEntry {
    pub token: RedeemToken,
    pub business: Option<Business>,
}

/// Motor de redención: genera, muestra y marca tokens de un solo uso.
///
/// Holds no token state of its own; every operation re-reads through the
/// store, and the only mutation is the store's conditional mark-used.
pub struct RedeemService {
    store: Arc<dyn TokenStore>,
    businesses: Arc<dyn BusinessDirectory>,
    users: Arc<dyn UserDirectory>,
    generator: TokenGenerator,
    policy: ExpiryPolicy,
}

impl RedeemService {
    pub fn new(
        store: Arc<dyn TokenStore>,
        businesses: Arc<dyn BusinessDirectory>,
        users: Arc<dyn UserDirectory>,
        generator: TokenGenerator,
        policy: ExpiryPolicy,
    ) -> Self {
        Self {
            store,
            businesses,
            users,
            generator,
            policy,
        }
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Crear y persistir un token nuevo para (user, business).
    ///
    /// Every call inserts a fresh row; repeat requests are not deduplicated.
    /// Token-string collisions are retried with a new string up to
    /// `MAX_TOKEN_ATTEMPTS` times.
    pub async fn issue_token(
        &self,
        request: IssueTokenRequest,
    ) -> Result<RedeemToken, RedeemError> {
        self.validate_issue_request(&request)?;

        let business = self
            .businesses
            .find_business(request.business_id)
            .await?
            .ok_or_else(|| {
                RedeemError::Validation(format!(
                    "Business {} not found",
                    request.business_id
                ))
            })?;

        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let token = self.generator.generate();
            let now = Utc::now();
            let new_token = NewRedeemToken {
                token,
                user_id: request.user_id,
                business_id: request.business_id,
                redeem_type: request.redeem_type,
                month_index: request.month_index,
                month_data: request.month_data.clone(),
                expires_at: self.policy.expiry_from(now),
            };

            match self.store.insert(new_token).await {
                Ok(stored) => {
                    record_token_issued(stored.redeem_type.as_str());
                    info!(
                        user_id = stored.user_id,
                        business = %business.name,
                        redeem_type = stored.redeem_type.as_str(),
                        "🎟️ Issued redemption token"
                    );
                    return Ok(stored);
                }
                Err(StoreError::DuplicateToken) => {
                    record_token_collision();
                    warn!(attempt, "Token string collision, regenerating");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RedeemError::Storage(format!(
            "could not generate a unique token after {} attempts",
            MAX_TOKEN_ATTEMPTS
        )))
    }

    /// Datos para la página de redención.
    ///
    /// Under the owner-gated policy the viewer must be the issuing user and
    /// expired tokens are rejected; under the open policy possession of the
    /// token string is enough and expiry is ignored. A used token is
    /// rejected in both modes.
    pub async fn get_for_view(
        &self,
        token_str: &str,
        viewer: Option<i64>,
    ) -> Result<TokenView, RedeemError> {
        let token = self
            .store
            .find_by_token(token_str)
            .await?
            .ok_or(RedeemError::NotFound)?;

        if self.policy.owner_gated() {
            match viewer {
                Some(user_id) if user_id == token.user_id => {}
                _ => return Err(RedeemError::Unauthorized),
            }
            if token.is_expired() {
                return Err(RedeemError::Expired);
            }
        }

        if token.is_used() {
            return Err(RedeemError::AlreadyUsed);
        }

        let business = self
            .businesses
            .find_business(token.business_id)
            .await?
            .ok_or(RedeemError::BusinessNotFound)?;

        Ok(TokenView {
            month_special: token.month_special(),
            token,
            business,
        })
    }

    /// Canjear: marcar el token como usado, exactamente una vez.
    ///
    /// No ownership or expiry check on this path; holding the token string
    /// is the credential. Concurrent calls race on the store's conditional
    /// update and exactly one of them wins.
    pub async fn redeem(&self, token_str: &str) -> Result<RedemptionOutcome, RedeemError> {
        let mut token = match self.store.find_by_token(token_str).await? {
            Some(token) => token,
            None => {
                record_redemption("not_found");
                return Err(RedeemError::NotFound);
            }
        };

        let now = Utc::now();
        if !self.store.mark_used_if_unused(token_str, now).await? {
            // Benign outcome: someone else scanned first (or the same code
            // was scanned twice). Not an error condition.
            record_redemption("already_used");
            info!(token_id = token.id, "Redemption token already used");
            return Err(RedeemError::AlreadyUsed);
        }

        token.used_at = Some(now);
        token.date_updated = now;

        let business = match self.businesses.find_business(token.business_id).await {
            Ok(business) => business,
            Err(e) => {
                warn!("Business lookup failed after redemption: {}", e);
                None
            }
        };
        let user = match self.users.find_user(token.user_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!("User lookup failed after redemption: {}", e);
                None
            }
        };

        record_redemption("success");
        info!(
            token_id = token.id,
            user_id = token.user_id,
            business_id = token.business_id,
            "✅ Redemption token marked as used"
        );

        Ok(RedemptionOutcome {
            token,
            business,
            user,
            redeemed_at: now,
        })
    }

    /// Historial de redenciones del usuario, más reciente primero.
    pub async fn list_history(&self, user_id: i64) -> Result<Vec<HistoryEntry>, RedeemError> {
        let tokens = self.store.list_for_user(user_id).await?;

        let mut entries = Vec::with_capacity(tokens.len());
        for token in tokens {
            let business = match self.businesses.find_business(token.business_id).await {
                Ok(business) => business,
                Err(e) => {
                    warn!("Business lookup failed for history: {}", e);
                    None
                }
            };
            entries.push(HistoryEntry { token, business });
        }

        Ok(entries)
    }

    fn validate_issue_request(&self, request: &IssueTokenRequest) -> Result<(), RedeemError> {
        match request.redeem_type {
            RedeemType::MonthlySpecial => {
                let month_index = request.month_index.ok_or_else(|| {
                    RedeemError::Validation(
                        "monthIndex is required for monthlySpecial tokens".to_string(),
                    )
                })?;
                if !(0..=11).contains(&month_index) {
                    return Err(RedeemError::Validation(format!(
                        "monthIndex {} is out of range (expected 0-11)",
                        month_index
                    )));
                }
                match request.month_data.as_deref() {
                    Some(data) if !data.trim().is_empty() => {}
                    _ => {
                        return Err(RedeemError::Validation(
                            "monthData is required for monthlySpecial tokens".to_string(),
                        ))
                    }
                }
            }
            RedeemType::OneSpecial => {
                if request.month_index.is_some() || request.month_data.is_some() {
                    return Err(RedeemError::Validation(
                        "month fields are only valid for monthlySpecial tokens".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
