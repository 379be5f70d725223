// ============================================================================
// TOKEN LIFECYCLE TESTS
// ============================================================================
// Engine-level coverage over the in-memory store: issue, view, redeem-once,
// history and admin reporting. The Postgres store shares this trait surface.
// ============================================================================

use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;

use redeem_ws::config::ExpiryPolicy;
use redeem_ws::domains::redeem::{
    AdminService, IssueTokenRequest, MemoryTokenStore, NewRedeemToken, RedeemError,
    RedeemService, RedeemType, TokenFilter, TokenGenerator, TokenStore,
};
use redeem_ws::services::directory::{Business, MemoryDirectory, UserProfile};

// ============================================================================
// HELPERS
// ============================================================================

fn seeded_directory() -> Arc<MemoryDirectory> {
    let directory = MemoryDirectory::new();
    directory.add_business(Business {
        id: 7,
        name: "Harbor Pizza".to_string(),
        slug: Some("harbor-pizza".to_string()),
    });
    directory.add_business(Business {
        id: 9,
        name: "Cafe Central".to_string(),
        slug: Some("cafe-central".to_string()),
    });
    directory.add_user(UserProfile {
        id: 42,
        username: "scanner42".to_string(),
        email: Some("scanner42@example.com".to_string()),
    });
    directory.add_user(UserProfile {
        id: 43,
        username: "other_user".to_string(),
        email: None,
    });
    Arc::new(directory)
}

fn build_service(policy: ExpiryPolicy) -> (Arc<MemoryTokenStore>, RedeemService) {
    let store = Arc::new(MemoryTokenStore::new());
    let directory = seeded_directory();
    let service = RedeemService::new(
        store.clone(),
        directory.clone(),
        directory,
        TokenGenerator::default(),
        policy,
    );
    (store, service)
}

fn one_special(user_id: i64, business_id: i64) -> IssueTokenRequest {
    IssueTokenRequest {
        user_id,
        business_id,
        redeem_type: RedeemType::OneSpecial,
        month_index: None,
        month_data: None,
    }
}

fn monthly_special(
    user_id: i64,
    business_id: i64,
    month_index: Option<i32>,
    month_data: Option<&str>,
) -> IssueTokenRequest {
    IssueTokenRequest {
        user_id,
        business_id,
        redeem_type: RedeemType::MonthlySpecial,
        month_index,
        month_data: month_data.map(|s| s.to_string()),
    }
}

// ============================================================================
// ISSUING
// ============================================================================

#[tokio::test]
async fn test_issue_creates_active_token() {
    let (_store, service) = build_service(ExpiryPolicy::LongLived);

    let token = service.issue_token(one_special(42, 7)).await.unwrap();

    assert_eq!(token.token.len(), 32);
    assert!(token.token.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(token.user_id, 42);
    assert_eq!(token.business_id, 7);
    assert_eq!(token.redeem_type, RedeemType::OneSpecial);
    assert!(token.used_at.is_none());
    assert!(token.expires_at > Utc::now());
    assert!(token.is_valid());
}

#[tokio::test]
async fn test_issue_does_not_deduplicate_repeat_requests() {
    let (store, service) = build_service(ExpiryPolicy::LongLived);

    let first = service.issue_token(one_special(42, 7)).await.unwrap();
    let second = service.issue_token(one_special(42, 7)).await.unwrap();

    assert_ne!(first.token, second.token);
    assert_eq!(
        store.count_for_user(42, TokenFilter::All).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn test_issued_tokens_are_unique_across_a_batch() {
    let (_store, service) = build_service(ExpiryPolicy::LongLived);

    let mut seen = HashSet::new();
    for _ in 0..1000 {
        let token = service.issue_token(one_special(42, 7)).await.unwrap();
        assert!(seen.insert(token.token), "duplicate token issued");
    }
}

#[tokio::test]
async fn test_issue_rejects_unknown_business() {
    let (_store, service) = build_service(ExpiryPolicy::LongLived);

    let err = service.issue_token(one_special(42, 999)).await.unwrap_err();
    match err {
        RedeemError::Validation(msg) => assert!(msg.contains("999")),
        other => panic!("expected Validation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_monthly_special_requires_month_data() {
    let (_store, service) = build_service(ExpiryPolicy::LongLived);

    let err = service
        .issue_token(monthly_special(42, 7, Some(3), None))
        .await
        .unwrap_err();
    assert!(matches!(err, RedeemError::Validation(_)));
}

#[tokio::test]
async fn test_monthly_special_requires_month_index() {
    let (_store, service) = build_service(ExpiryPolicy::LongLived);

    let err = service
        .issue_token(monthly_special(42, 7, None, Some("April|2x1 pizza")))
        .await
        .unwrap_err();
    assert!(matches!(err, RedeemError::Validation(_)));
}

#[tokio::test]
async fn test_monthly_special_rejects_out_of_range_month() {
    let (_store, service) = build_service(ExpiryPolicy::LongLived);

    let err = service
        .issue_token(monthly_special(42, 7, Some(12), Some("Nope|nope")))
        .await
        .unwrap_err();
    assert!(matches!(err, RedeemError::Validation(_)));
}

#[tokio::test]
async fn test_one_special_rejects_month_fields() {
    let (_store, service) = build_service(ExpiryPolicy::LongLived);

    let mut request = one_special(42, 7);
    request.month_data = Some("April|2x1 pizza".to_string());

    let err = service.issue_token(request).await.unwrap_err();
    assert!(matches!(err, RedeemError::Validation(_)));
}

#[tokio::test]
async fn test_monthly_special_round_trips_month_data() {
    let (_store, service) = build_service(ExpiryPolicy::LongLived);

    let token = service
        .issue_token(monthly_special(42, 7, Some(3), Some("April|2x1 pizza")))
        .await
        .unwrap();

    let parsed = token.month_special().unwrap();
    assert_eq!(parsed.month, "April");
    assert_eq!(parsed.special, "2x1 pizza");
    assert_eq!(token.month_index, Some(3));
}

#[tokio::test]
async fn test_expiry_follows_policy_horizon() {
    let (_store, short_service) = build_service(ExpiryPolicy::ShortLived);
    let token = short_service.issue_token(one_special(42, 7)).await.unwrap();

    let horizon = token.expires_at - Utc::now();
    assert!(horizon <= Duration::hours(24));
    assert!(horizon > Duration::hours(23));

    let (_store, long_service) = build_service(ExpiryPolicy::LongLived);
    let token = long_service.issue_token(one_special(42, 7)).await.unwrap();
    assert!(token.expires_at - Utc::now() > Duration::days(3000));
}

// ============================================================================
// VIEWING
// ============================================================================

#[tokio::test]
async fn test_open_view_allows_anonymous_viewer() {
    let (_store, service) = build_service(ExpiryPolicy::LongLived);
    let token = service.issue_token(one_special(42, 7)).await.unwrap();

    let view = service.get_for_view(&token.token, None).await.unwrap();
    assert_eq!(view.token.token, token.token);
    assert_eq!(view.business.id, 7);
    assert_eq!(view.business.name, "Harbor Pizza");
}

#[tokio::test]
async fn test_open_view_ignores_expiry() {
    let (store, service) = build_service(ExpiryPolicy::LongLived);
    let stored = store
        .insert(NewRedeemToken {
            token: "expiredExpiredExpiredExpired1234".to_string(),
            user_id: 42,
            business_id: 7,
            redeem_type: RedeemType::OneSpecial,
            month_index: None,
            month_data: None,
            expires_at: Utc::now() - Duration::hours(1),
        })
        .await
        .unwrap();

    // Usage-only gating: an expired but unused token still renders.
    assert!(service.get_for_view(&stored.token, None).await.is_ok());
}

#[tokio::test]
async fn test_owner_gated_view_rejects_non_owner() {
    let (_store, service) = build_service(ExpiryPolicy::ShortLived);
    let token = service.issue_token(one_special(42, 7)).await.unwrap();

    let err = service
        .get_for_view(&token.token, Some(43))
        .await
        .unwrap_err();
    assert!(matches!(err, RedeemError::Unauthorized));

    let err = service.get_for_view(&token.token, None).await.unwrap_err();
    assert!(matches!(err, RedeemError::Unauthorized));

    assert!(service.get_for_view(&token.token, Some(42)).await.is_ok());
}

#[tokio::test]
async fn test_owner_gated_view_rejects_expired() {
    let (store, service) = build_service(ExpiryPolicy::ShortLived);
    let stored = store
        .insert(NewRedeemToken {
            token: "staleStaleStaleStaleStaleStale12".to_string(),
            user_id: 42,
            business_id: 7,
            redeem_type: RedeemType::OneSpecial,
            month_index: None,
            month_data: None,
            expires_at: Utc::now() - Duration::minutes(5),
        })
        .await
        .unwrap();

    let err = service
        .get_for_view(&stored.token, Some(42))
        .await
        .unwrap_err();
    assert!(matches!(err, RedeemError::Expired));
}

#[tokio::test]
async fn test_view_reports_already_used() {
    let (_store, service) = build_service(ExpiryPolicy::LongLived);
    let token = service.issue_token(one_special(42, 7)).await.unwrap();
    service.redeem(&token.token).await.unwrap();

    let err = service.get_for_view(&token.token, None).await.unwrap_err();
    assert!(matches!(err, RedeemError::AlreadyUsed));
}

#[tokio::test]
async fn test_view_unknown_token_is_not_found() {
    let (_store, service) = build_service(ExpiryPolicy::LongLived);

    let err = service.get_for_view("missing", None).await.unwrap_err();
    assert!(matches!(err, RedeemError::NotFound));
}

#[tokio::test]
async fn test_view_fails_when_business_is_gone() {
    let (store, service) = build_service(ExpiryPolicy::LongLived);
    // Inserted behind the engine's back with a business id the directory
    // does not know.
    let stored = store
        .insert(NewRedeemToken {
            token: "orphanOrphanOrphanOrphanOrpha123".to_string(),
            user_id: 42,
            business_id: 555,
            redeem_type: RedeemType::OneSpecial,
            month_index: None,
            month_data: None,
            expires_at: Utc::now() + Duration::hours(24),
        })
        .await
        .unwrap();

    let err = service.get_for_view(&stored.token, None).await.unwrap_err();
    assert!(matches!(err, RedeemError::BusinessNotFound));
}

// ============================================================================
// REDEEMING
// ============================================================================

#[tokio::test]
async fn test_redeem_marks_used_exactly_once() {
    let (store, service) = build_service(ExpiryPolicy::LongLived);
    let token = service.issue_token(one_special(42, 7)).await.unwrap();

    let outcome = service.redeem(&token.token).await.unwrap();
    assert!(outcome.token.used_at.is_some());
    assert_eq!(outcome.business.as_ref().unwrap().id, 7);
    assert_eq!(outcome.user.as_ref().unwrap().id, 42);

    let used_at = store
        .find_by_token(&token.token)
        .await
        .unwrap()
        .unwrap()
        .used_at
        .unwrap();

    let err = service.redeem(&token.token).await.unwrap_err();
    assert!(matches!(err, RedeemError::AlreadyUsed));

    // The second attempt must not have touched the timestamp.
    let after = store
        .find_by_token(&token.token)
        .await
        .unwrap()
        .unwrap()
        .used_at
        .unwrap();
    assert_eq!(used_at, after);
}

#[tokio::test]
async fn test_redeem_unknown_token_is_not_found() {
    let (_store, service) = build_service(ExpiryPolicy::LongLived);

    let err = service.redeem("noSuchToken").await.unwrap_err();
    assert!(matches!(err, RedeemError::NotFound));
}

#[tokio::test]
async fn test_redeem_ignores_expiry() {
    let (store, service) = build_service(ExpiryPolicy::ShortLived);
    let stored = store
        .insert(NewRedeemToken {
            token: "lateScanLateScanLateScanLateSc12".to_string(),
            user_id: 42,
            business_id: 7,
            redeem_type: RedeemType::OneSpecial,
            month_index: None,
            month_data: None,
            expires_at: Utc::now() - Duration::minutes(1),
        })
        .await
        .unwrap();

    // Possession of the token string is the credential on this path.
    assert!(service.redeem(&stored.token).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_redeems_have_exactly_one_winner() {
    let (_store, service) = build_service(ExpiryPolicy::LongLived);
    let service = Arc::new(service);
    let token = service.issue_token(one_special(42, 7)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let token_str = token.token.clone();
        handles.push(tokio::spawn(
            async move { service.redeem(&token_str).await },
        ));
    }

    let mut winners = 0;
    let mut already_used = 0;
    for result in futures::future::join_all(handles).await {
        match result.unwrap() {
            Ok(outcome) => {
                assert!(outcome.token.used_at.is_some());
                winners += 1;
            }
            Err(RedeemError::AlreadyUsed) => already_used += 1,
            Err(other) => panic!("unexpected error under concurrency: {:?}", other),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(already_used, 7);
}

// ============================================================================
// HISTORY
// ============================================================================

#[tokio::test]
async fn test_history_is_newest_first() {
    let (_store, service) = build_service(ExpiryPolicy::LongLived);

    let first = service.issue_token(one_special(42, 7)).await.unwrap();
    let second = service.issue_token(one_special(42, 9)).await.unwrap();
    let third = service.issue_token(one_special(42, 7)).await.unwrap();
    service.issue_token(one_special(43, 7)).await.unwrap();

    let history = service.list_history(42).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].token.id, third.id);
    assert_eq!(history[1].token.id, second.id);
    assert_eq!(history[2].token.id, first.id);
    assert_eq!(history[1].business.as_ref().unwrap().name, "Cafe Central");
}

#[tokio::test]
async fn test_history_tolerates_deleted_business() {
    let (store, service) = build_service(ExpiryPolicy::LongLived);
    store
        .insert(NewRedeemToken {
            token: "ghostGhostGhostGhostGhostGhos123".to_string(),
            user_id: 42,
            business_id: 777,
            redeem_type: RedeemType::OneSpecial,
            month_index: None,
            month_data: None,
            expires_at: Utc::now() + Duration::hours(24),
        })
        .await
        .unwrap();

    let history = service.list_history(42).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].business.is_none());
}

// ============================================================================
// ADMIN REPORTING
// ============================================================================

fn build_admin(store: Arc<MemoryTokenStore>) -> AdminService {
    AdminService::new(store, seeded_directory())
}

#[tokio::test]
async fn test_summary_counts_per_user() {
    let (store, service) = build_service(ExpiryPolicy::LongLived);

    for _ in 0..3 {
        service.issue_token(one_special(42, 7)).await.unwrap();
    }
    let redeemed = service.issue_token(one_special(42, 7)).await.unwrap();
    service.redeem(&redeemed.token).await.unwrap();
    service.issue_token(one_special(43, 9)).await.unwrap();

    let admin = build_admin(store);
    let report = admin.per_user_summary().await.unwrap();

    assert_eq!(report.len(), 2);
    // Highest totals first.
    assert_eq!(report[0].user_id, 42);
    assert_eq!(report[0].total, 4);
    assert_eq!(report[0].used, 1);
    assert_eq!(report[0].active, 3);
    assert_eq!(report[0].user.as_ref().unwrap().username, "scanner42");

    assert_eq!(report[1].user_id, 43);
    assert_eq!(report[1].total, 1);
    assert_eq!(report[1].used, 0);
    assert_eq!(report[1].active, 1);
}

#[tokio::test]
async fn test_summary_tolerates_unknown_user() {
    let (store, _service) = build_service(ExpiryPolicy::LongLived);
    store
        .insert(NewRedeemToken {
            token: "strayStrayStrayStrayStrayStra123".to_string(),
            user_id: 999,
            business_id: 7,
            redeem_type: RedeemType::OneSpecial,
            month_index: None,
            month_data: None,
            expires_at: Utc::now() + Duration::hours(24),
        })
        .await
        .unwrap();

    let admin = build_admin(store);
    let report = admin.per_user_summary().await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].user_id, 999);
    assert!(report[0].user.is_none());
}

#[tokio::test]
async fn test_clear_history_removes_user_from_summary() {
    let (store, service) = build_service(ExpiryPolicy::LongLived);

    service.issue_token(one_special(42, 7)).await.unwrap();
    let used = service.issue_token(one_special(42, 7)).await.unwrap();
    service.redeem(&used.token).await.unwrap();
    service.issue_token(one_special(43, 9)).await.unwrap();

    let admin = build_admin(store.clone());
    let deleted = admin.clear_history(42).await.unwrap();
    assert_eq!(deleted, 2);

    let report = admin.per_user_summary().await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].user_id, 43);

    assert_eq!(
        store.count_for_user(42, TokenFilter::All).await.unwrap(),
        0
    );
    // Clearing again is a no-op.
    assert_eq!(admin.clear_history(42).await.unwrap(), 0);
}

#[tokio::test]
async fn test_count_filters_distinguish_used_and_active() {
    let (store, service) = build_service(ExpiryPolicy::LongLived);

    service.issue_token(one_special(42, 7)).await.unwrap();
    service.issue_token(one_special(42, 7)).await.unwrap();
    let used = service.issue_token(one_special(42, 7)).await.unwrap();
    service.redeem(&used.token).await.unwrap();

    assert_eq!(store.count_for_user(42, TokenFilter::All).await.unwrap(), 3);
    assert_eq!(store.count_for_user(42, TokenFilter::Used).await.unwrap(), 1);
    assert_eq!(
        store.count_for_user(42, TokenFilter::Active).await.unwrap(),
        2
    );
}

// ============================================================================
// FULL SCENARIO
// ============================================================================

// The reference walkthrough: issue for user 42 / business 7, verify the
// stored shape, first scan wins, second scan reports already-used.
#[tokio::test]
async fn test_full_redemption_scenario() {
    let (store, service) = build_service(ExpiryPolicy::LongLived);

    let token = service.issue_token(one_special(42, 7)).await.unwrap();
    assert_eq!(token.token.len(), 32);
    assert_eq!(token.user_id, 42);
    assert_eq!(token.business_id, 7);
    assert!(token.expires_at > Utc::now());
    assert!(token.used_at.is_none());

    let view = service.get_for_view(&token.token, None).await.unwrap();
    assert_eq!(view.business.name, "Harbor Pizza");

    let outcome = service.redeem(&token.token).await.unwrap();
    assert!(outcome.token.used_at.is_some());
    assert_eq!(outcome.user.as_ref().unwrap().username, "scanner42");

    let err = service.redeem(&token.token).await.unwrap_err();
    assert!(matches!(err, RedeemError::AlreadyUsed));

    let persisted = store
        .find_by_token(&token.token)
        .await
        .unwrap()
        .unwrap();
    assert!(persisted.is_used());
    assert!(!persisted.is_valid());
}
