// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Gateway integration tests.
//!
//! Test categories:
//! - Public path bypass
//! - Token extraction and validation
//! - Role enrichment
//! - Revocation checks and store failure handling
//! - Client throttling

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use warden_auth::{
    Action, AuthGateway, GatewayRequest, RateLimitConfig, RbacConfig, RbacPolicy,
    RevocationFailureMode, RevocationStore, RoleDefinition,
};
use warden_tests::prelude::*;

// =============================================================================
// Public Paths
// =============================================================================

#[tokio::test]
async fn test_public_paths_bypass_authentication() {
    init_test_logging();
    let harness = GatewayHarness::new();

    for path in ["/health", "/public/docs/index.html"] {
        let decision = harness.authorize_from("10.0.0.1", path, None).await.unwrap();
        assert!(!decision.is_authenticated(), "{path} should be public");
        assert!(!decision.identity().is_authenticated());
    }
}

#[tokio::test]
async fn test_public_path_ignores_garbage_token() {
    init_test_logging();
    let harness = GatewayHarness::new();

    let decision = harness
        .authorize_from("10.0.0.1", "/health", Some("Bearer not.a.jwt"))
        .await
        .unwrap();
    assert!(!decision.is_authenticated());
}

#[tokio::test]
async fn test_public_prefix_does_not_match_sibling() {
    init_test_logging();
    let harness = GatewayHarness::new();

    let result = harness.authorize_from("10.0.0.1", "/publicity", None).await;
    assert_auth_error(result, "UNAUTHENTICATED");
}

// =============================================================================
// Token Validation
// =============================================================================

#[tokio::test]
async fn test_missing_or_malformed_header_is_unauthenticated() {
    init_test_logging();
    let harness = GatewayHarness::new();
    let token = viewer_token("user-1").token;

    assert_auth_error(harness.authorize_from("c", PROTECTED_PATH, None).await, "UNAUTHENTICATED");

    let basic = format!("Basic {token}");
    assert_auth_error(
        harness.authorize_from("c", PROTECTED_PATH, Some(&basic)).await,
        "UNAUTHENTICATED",
    );
    assert_auth_error(
        harness.authorize_from("c", PROTECTED_PATH, Some("Bearer ")).await,
        "UNAUTHENTICATED",
    );
}

#[tokio::test]
async fn test_valid_token_authenticates() {
    init_test_logging();
    let harness = GatewayHarness::new();
    let issued = viewer_token("user-1");

    let decision = harness.authorize(&issued.token).await.unwrap();
    assert!(decision.is_authenticated());

    let identity = decision.identity();
    assert_eq!(identity.subject_id(), "user-1");
    assert_eq!(identity.email(), Some("user-1@example.com"));
    assert_eq!(identity.token_id(), issued.jti.as_deref());
    assert!(identity.has_role("viewer"));
}

#[tokio::test]
async fn test_invalid_tokens_rejected() {
    init_test_logging();
    let harness = GatewayHarness::new();

    for token in [
        expired_token(),
        wrong_secret_token(),
        wrong_algorithm_token(),
        "definitely-not-a-jwt".to_string(),
    ] {
        assert_auth_error(harness.authorize(&token).await, "INVALID_TOKEN");
    }
}

// =============================================================================
// Enrichment
// =============================================================================

#[tokio::test]
async fn test_roles_expand_to_permissions() {
    init_test_logging();
    let harness = GatewayHarness::new();

    let decision = harness.authorize(&viewer_token("user-1").token).await.unwrap();
    let identity = decision.identity();
    assert!(identity.can(Action::Read, "Orders", Some("Invoice")));
    assert!(!identity.can(Action::Write, "Orders", None));

    let decision = harness.authorize(&admin_token().token).await.unwrap();
    assert!(decision.identity().can(Action::Delete, "Auth", Some("Session")));
}

#[tokio::test]
async fn test_roleless_token_gets_default_role() {
    init_test_logging();
    let policy = RbacPolicy::new(&RbacConfig::default().with_default_role("viewer"));
    let harness = GatewayHarness::builder().policy(policy).build();

    let identity = warden_auth::IdentityContext::builder("bare-user").build();
    let decision = harness.authorize(&token_for(&identity).token).await.unwrap();
    assert!(decision.identity().has_role("viewer"));
    assert!(decision.identity().can(Action::Read, "Orders", None));
}

#[tokio::test]
async fn test_custom_role_and_direct_permissions() {
    init_test_logging();
    let config = RbacConfig::default()
        .with_role("auditor", RoleDefinition::new(["read:Audit", "delete:Audit.Report"]));
    let harness = GatewayHarness::builder().policy(RbacPolicy::new(&config)).build();

    let identity = warden_auth::IdentityContext::builder("aud-1")
        .role("auditor")
        .permission("write:Notes")
        .build();
    let decision = harness.authorize(&token_for(&identity).token).await.unwrap();
    let identity = decision.identity();

    assert!(identity.can(Action::Read, "Audit", Some("Log")));
    assert!(identity.can(Action::Delete, "Audit", Some("Report")));
    assert!(!identity.can(Action::Delete, "Audit", Some("Purge")));
    assert!(identity.can(Action::Write, "Notes", None));
    assert!(!identity.can(Action::Read, "Orders", None));
}

#[tokio::test]
async fn test_without_policy_only_token_permissions_apply() {
    init_test_logging();
    let harness = GatewayHarness::builder().without_policy().build();

    let decision = harness.authorize(&viewer_token("user-1").token).await.unwrap();
    assert!(decision.identity().has_role("viewer"));
    assert!(decision.identity().permissions().is_empty());
}

// =============================================================================
// Revocation
// =============================================================================

#[tokio::test]
async fn test_revoked_token_rejected() {
    init_test_logging();
    let harness = GatewayHarness::new();
    let issued = viewer_token("user-1");
    let other = viewer_token("user-1");

    harness
        .store
        .revoke_token(issued.jti.as_deref().unwrap())
        .await
        .unwrap();

    assert_auth_error(harness.authorize(&issued.token).await, "TOKEN_REVOKED");
    assert!(harness.authorize(&other.token).await.is_ok());
}

#[tokio::test]
async fn test_session_cutoff_rejects_older_tokens() {
    init_test_logging();
    let harness = GatewayHarness::new();
    let identity = viewer_identity("user-1");

    let old = token_issued_at(&identity, Utc::now() - chrono::Duration::minutes(20));
    let fresh = token_for(&identity);
    harness
        .store
        .revoke_all_user_tokens("user-1", Utc::now() - chrono::Duration::minutes(10))
        .await
        .unwrap();

    assert_auth_error(harness.authorize(&old.token).await, "SESSION_INVALIDATED");
    assert!(harness.authorize(&fresh.token).await.is_ok());
    assert!(harness.authorize(&viewer_token("user-2").token).await.is_ok());
}

#[tokio::test]
async fn test_revoked_jti_wins_over_older_cutoff() {
    init_test_logging();
    let harness = GatewayHarness::new();
    let identity = viewer_identity("user-1");

    let cutoff = Utc::now() - chrono::Duration::minutes(10);
    harness
        .store
        .revoke_all_user_tokens("user-1", cutoff)
        .await
        .unwrap();

    let issued = token_issued_at(&identity, cutoff + chrono::Duration::minutes(5));
    assert!(issued.issued_at > cutoff);
    assert!(harness.authorize(&issued.token).await.is_ok());

    harness
        .store
        .revoke_token(issued.jti.as_deref().unwrap())
        .await
        .unwrap();
    assert_auth_error(harness.authorize(&issued.token).await, "TOKEN_REVOKED");
}

#[tokio::test]
async fn test_token_without_jti_still_checked_against_cutoff() {
    init_test_logging();
    let harness = GatewayHarness::new();
    let token = token_without_jti("user-1");

    let decision = harness.authorize(&token).await.unwrap();
    assert!(decision.identity().token_id().is_none());

    harness
        .store
        .revoke_all_user_tokens("user-1", Utc::now() + chrono::Duration::seconds(5))
        .await
        .unwrap();
    assert_auth_error(harness.authorize(&token).await, "SESSION_INVALIDATED");
}

#[tokio::test]
async fn test_token_without_iat_rejected_once_cutoff_exists() {
    init_test_logging();
    let harness = GatewayHarness::new();
    let token = token_without_iat("user-1");

    assert!(harness.authorize(&token).await.is_ok());

    harness
        .store
        .revoke_all_user_tokens("user-1", Utc::now() - chrono::Duration::days(30))
        .await
        .unwrap();
    assert_auth_error(harness.authorize(&token).await, "SESSION_INVALIDATED");
}

#[tokio::test]
async fn test_revocation_disabled_skips_store() {
    init_test_logging();
    let store = Arc::new(FailingRevocationStore::new());
    let harness = GatewayHarness::builder()
        .revocation_store(store.clone())
        .without_revocation()
        .build();

    assert!(harness.authorize(&viewer_token("user-1").token).await.is_ok());
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_store_failure_fails_closed_by_default() {
    init_test_logging();
    let store = Arc::new(FailingRevocationStore::new());
    let harness = GatewayHarness::builder().revocation_store(store.clone()).build();

    let result = harness.authorize(&viewer_token("user-1").token).await;
    assert_auth_error(result, "REVOCATION_UNAVAILABLE");
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn test_store_failure_fails_open_when_configured() {
    init_test_logging();
    let store = Arc::new(FailingRevocationStore::new());
    let harness = GatewayHarness::builder()
        .revocation_store(store.clone())
        .failure_mode(RevocationFailureMode::FailOpen)
        .build();

    let decision = harness.authorize(&viewer_token("user-1").token).await.unwrap();
    assert!(decision.is_authenticated());
    // Both the token and the session lookup were attempted.
    assert_eq!(store.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_store_times_out() {
    init_test_logging();
    let store = Arc::new(SlowRevocationStore::new(Duration::from_secs(5)));
    let harness = GatewayHarness::builder()
        .revocation_store(store.clone())
        .revocation_timeout(Duration::from_millis(100))
        .build();

    let result = harness.authorize(&viewer_token("user-1").token).await;
    assert_auth_error(result, "REVOCATION_UNAVAILABLE");
}

#[tokio::test(start_paused = true)]
async fn test_slow_store_within_timeout_answers() {
    init_test_logging();
    let store = Arc::new(SlowRevocationStore::new(Duration::from_millis(20)));
    let harness = GatewayHarness::builder()
        .revocation_store(store.clone())
        .revocation_timeout(Duration::from_millis(100))
        .build();
    let issued = viewer_token("user-1");

    assert!(harness.authorize(&issued.token).await.is_ok());
    store
        .inner()
        .revoke_token(issued.jti.as_deref().unwrap())
        .await
        .unwrap();
    assert_auth_error(harness.authorize(&issued.token).await, "TOKEN_REVOKED");
}

// =============================================================================
// Client Throttling
// =============================================================================

#[tokio::test]
async fn test_client_throttled_after_repeated_failures() {
    init_test_logging();
    let harness = GatewayHarness::builder()
        .client_limit(RateLimitConfig::default().with_max_attempts(3, 60))
        .build();
    let valid = bearer(&viewer_token("user-1").token);

    for _ in 0..3 {
        let result = harness
            .authorize_from("10.0.0.9", PROTECTED_PATH, Some("Bearer forged"))
            .await;
        assert_auth_error(result, "INVALID_TOKEN");
    }

    // Throttled even with a valid token.
    let result = harness
        .authorize_from("10.0.0.9", PROTECTED_PATH, Some(&valid))
        .await;
    assert_auth_error(result, "RATE_LIMITED");

    // Other clients and public paths are unaffected.
    assert!(harness
        .authorize_from("10.0.0.10", PROTECTED_PATH, Some(&valid))
        .await
        .is_ok());
    assert!(harness.authorize_from("10.0.0.9", "/health", None).await.is_ok());

    harness.clock.advance(chrono::Duration::seconds(61));
    assert!(harness
        .authorize_from("10.0.0.9", PROTECTED_PATH, Some(&valid))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_client_successes_do_not_count() {
    init_test_logging();
    let harness = GatewayHarness::builder()
        .client_limit(RateLimitConfig::default().with_max_attempts(2, 60))
        .build();
    let valid = bearer(&viewer_token("user-1").token);

    for _ in 0..5 {
        assert!(harness
            .authorize_from("10.0.0.9", PROTECTED_PATH, Some(&valid))
            .await
            .is_ok());
    }
    let limiter = harness.client_limiter.as_ref().unwrap();
    assert!(limiter.snapshot("10.0.0.9").is_none());
}

#[tokio::test]
async fn test_client_limiter_failure_propagates() {
    init_test_logging();
    let gateway = AuthGateway::builder(test_validator())
        .client_limiter(Arc::new(FailingRateLimiter))
        .build();
    let header = bearer(&viewer_token("user-1").token);

    let result = gateway
        .authorize(
            &GatewayRequest::new(PROTECTED_PATH)
                .with_authorization(&header)
                .with_client("10.0.0.1"),
        )
        .await;
    assert_auth_error(result, "BACKEND_ERROR");
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_concurrent_authorizations_share_revocations() {
    init_test_logging();
    let harness = Arc::new(GatewayHarness::new());
    let tokens: Vec<_> = (0..16).map(|i| viewer_token(&format!("user-{i}"))).collect();

    for issued in tokens.iter().step_by(2) {
        harness
            .store
            .revoke_token(issued.jti.as_deref().unwrap())
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for (i, issued) in tokens.into_iter().enumerate() {
        let harness = harness.clone();
        handles.push(tokio::spawn(async move {
            (i, harness.authorize(&issued.token).await.is_ok())
        }));
    }
    for handle in handles {
        let (i, allowed) = handle.await.unwrap();
        assert_eq!(allowed, i % 2 == 1, "token {i}");
    }
}
