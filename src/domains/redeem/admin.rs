use std::sync::Arc;
use tracing::{info, warn};

use super::models::RedeemError;
use super::store::TokenStore;
use crate::observability::metrics::record_history_cleared;
use crate::services::directory::{UserDirectory, UserProfile};

/// Admin report row: one user's token counts plus their profile, when the
/// user still resolves.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserTokenSummary {
    pub user_id: i64,
    pub user: Option<UserProfile>,
    pub total: i64,
    pub used: i64,
    pub active: i64,
}

/// Reporting and maintenance operations over the token store.
pub struct AdminService {
    store: Arc<dyn TokenStore>,
    users: Arc<dyn UserDirectory>,
}

impl AdminService {
    pub fn new(store: Arc<dyn TokenStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self { store, users }
    }

    /// Token counts per user (total / used / active), one row per user with
    /// at least one token, highest totals first.
    pub async fn per_user_summary(&self) -> Result<Vec<UserTokenSummary>, RedeemError> {
        let counts = self.store.summarize_by_user().await?;

        let mut summaries = Vec::with_capacity(counts.len());
        for row in counts {
            let user = match self.users.find_user(row.user_id).await {
                Ok(user) => user,
                Err(e) => {
                    warn!(user_id = row.user_id, "User lookup failed for summary: {}", e);
                    None
                }
            };
            summaries.push(UserTokenSummary {
                user_id: row.user_id,
                user,
                total: row.total,
                used: row.used,
                active: row.active,
            });
        }

        Ok(summaries)
    }

    /// Delete every token of a user, used or not. Irreversible.
    pub async fn clear_history(&self, user_id: i64) -> Result<u64, RedeemError> {
        let deleted = self.store.delete_all_for_user(user_id).await?;
        record_history_cleared(deleted);
        info!(user_id, deleted, "🧹 Cleared redemption history");
        Ok(deleted)
    }
}
