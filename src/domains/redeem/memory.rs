use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

use super::models::{NewRedeemToken, RedeemToken, TokenFilter, UserTokenCounts};
use super::store::{StoreError, TokenStore};

/// In-memory token store backed by a DashMap, keyed by token string.
///
/// Used by the test suite and by `REDEEM_STORE=memory` local runs. The two
/// atomic primitives map onto DashMap shard locks: `insert` goes through the
/// entry API so an occupied check and the write happen under one lock, and
/// `mark_used_if_unused` mutates through `get_mut` the same way.
pub struct MemoryTokenStore {
    tokens: DashMap<String, RedeemToken>,
    next_id: AtomicI64,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, new_token: NewRedeemToken) -> Result<RedeemToken, StoreError> {
        match self.tokens.entry(new_token.token.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateToken),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let stored = RedeemToken {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst),
                    token: new_token.token,
                    user_id: new_token.user_id,
                    business_id: new_token.business_id,
                    redeem_type: new_token.redeem_type,
                    month_index: new_token.month_index,
                    month_data: new_token.month_data,
                    expires_at: new_token.expires_at,
                    used_at: None,
                    date_created: now,
                    date_updated: now,
                    uid: Uuid::new_v4(),
                };
                slot.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RedeemToken>, StoreError> {
        Ok(self.tokens.get(token).map(|entry| entry.clone()))
    }

    async fn mark_used_if_unused(
        &self,
        token: &str,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        match self.tokens.get_mut(token) {
            Some(mut entry) if entry.used_at.is_none() => {
                entry.used_at = Some(used_at);
                entry.date_updated = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<RedeemToken>, StoreError> {
        let mut tokens: Vec<RedeemToken> = self
            .tokens
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.clone())
            .collect();

        tokens.sort_by(|a, b| {
            b.date_created
                .cmp(&a.date_created)
                .then(b.id.cmp(&a.id))
        });

        Ok(tokens)
    }

    async fn count_for_user(
        &self,
        user_id: i64,
        filter: TokenFilter,
    ) -> Result<i64, StoreError> {
        let now = Utc::now();
        let count = self
            .tokens
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .filter(|entry| match filter {
                TokenFilter::All => true,
                TokenFilter::Used => entry.used_at.is_some(),
                TokenFilter::Active => entry.used_at.is_none() && entry.expires_at > now,
            })
            .count();

        Ok(count as i64)
    }

    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        let keys: Vec<String> = self
            .tokens
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.token.clone())
            .collect();

        let mut deleted = 0;
        for key in keys {
            if self.tokens.remove(&key).is_some() {
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    async fn summarize_by_user(&self) -> Result<Vec<UserTokenCounts>, StoreError> {
        let now = Utc::now();
        let mut by_user: std::collections::HashMap<i64, UserTokenCounts> =
            std::collections::HashMap::new();

        for entry in self.tokens.iter() {
            let counts = by_user.entry(entry.user_id).or_insert(UserTokenCounts {
                user_id: entry.user_id,
                total: 0,
                used: 0,
                active: 0,
            });
            counts.total += 1;
            if entry.used_at.is_some() {
                counts.used += 1;
            } else if entry.expires_at > now {
                counts.active += 1;
            }
        }

        let mut summaries: Vec<UserTokenCounts> = by_user.into_values().collect();
        summaries.sort_by(|a, b| b.total.cmp(&a.total).then(a.user_id.cmp(&b.user_id)));

        Ok(summaries)
    }
}
