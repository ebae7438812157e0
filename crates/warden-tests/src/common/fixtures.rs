// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Test fixtures: secrets, configurations and pre-signed tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use warden_auth::{
    AuthConfig, BearerConfig, IdentityContext, IssuedToken, RateLimitConfig, TokenClaims,
    TokenIssuer, TokenValidator,
};

// =============================================================================
// Secrets and Credentials
// =============================================================================

/// HMAC secret shared by every fixture.
pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdefghij";

/// A second valid secret, used to forge tokens the validator must refuse.
pub const OTHER_SECRET: &str = "some-other-deployment-secret-9876543210zyx";

/// A password that satisfies the default policy.
pub const TEST_PASSWORD: &str = "CorrectHorse9Battery";

/// Default path used for protected requests.
pub const PROTECTED_PATH: &str = "/api/v1/things";

// =============================================================================
// Configurations
// =============================================================================

/// Bearer configuration for [`TEST_SECRET`].
pub fn test_bearer_config() -> BearerConfig {
    BearerConfig::hmac(TEST_SECRET)
}

/// Engine configuration with defaults and [`TEST_SECRET`].
pub fn test_auth_config() -> AuthConfig {
    AuthConfig::with_secret(TEST_SECRET)
}

/// Engine configuration with a tight login limit.
pub fn strict_login_config(max_attempts: u32) -> AuthConfig {
    let mut config = test_auth_config();
    config.rate_limit = RateLimitConfig::default().with_max_attempts(max_attempts, 60);
    config
}

/// YAML configuration file content for [`TEST_SECRET`].
pub fn test_config_yaml() -> String {
    format!(
        r#"
server:
  bind_address: 127.0.0.1
  port: 9191
auth:
  bearer:
    secret_key: "{TEST_SECRET}"
    issuer: warden-tests
  rbac:
    default_role: viewer
  rate_limit:
    max_attempts: 3
    window_seconds: 60
    lockout_threshold: 3
    lockout_duration_seconds: 120
  revocation:
    failure_mode: fail_closed
    timeout_ms: 100
logging:
  level: debug
"#
    )
}

// =============================================================================
// Validators and Issuers
// =============================================================================

/// Validator for [`TEST_SECRET`].
pub fn test_validator() -> TokenValidator {
    TokenValidator::new(test_bearer_config()).expect("valid test bearer config")
}

/// Issuer for [`TEST_SECRET`] with a one hour lifetime.
pub fn test_issuer() -> TokenIssuer {
    TokenIssuer::new(&test_bearer_config(), Duration::hours(1)).expect("valid test issuer")
}

// =============================================================================
// Identities
// =============================================================================

/// An administrator identity.
pub fn admin_identity() -> IdentityContext {
    IdentityContext::builder("admin-1")
        .email("admin@example.com")
        .role("admin")
        .build()
}

/// A read-only identity for `subject`.
pub fn viewer_identity(subject: &str) -> IdentityContext {
    IdentityContext::builder(subject)
        .email(format!("{subject}@example.com"))
        .role("viewer")
        .build()
}

// =============================================================================
// Tokens
// =============================================================================

/// Signs a token for `identity` as of now.
pub fn token_for(identity: &IdentityContext) -> IssuedToken {
    test_issuer().issue(identity).expect("token issued")
}

/// Signs a token for `identity` as of `issued_at`.
pub fn token_issued_at(identity: &IdentityContext, issued_at: DateTime<Utc>) -> IssuedToken {
    test_issuer()
        .issue_at(identity, issued_at)
        .expect("token issued")
}

/// A valid administrator token.
pub fn admin_token() -> IssuedToken {
    token_for(&admin_identity())
}

/// A valid viewer token.
pub fn viewer_token(subject: &str) -> IssuedToken {
    token_for(&viewer_identity(subject))
}

/// A token that expired an hour ago.
pub fn expired_token() -> String {
    token_issued_at(&viewer_identity("expired-user"), Utc::now() - Duration::hours(2)).token
}

/// A token signed with [`OTHER_SECRET`].
pub fn wrong_secret_token() -> String {
    TokenIssuer::new(&BearerConfig::hmac(OTHER_SECRET), Duration::hours(1))
        .expect("valid issuer")
        .issue(&viewer_identity("forged-user"))
        .expect("token issued")
        .token
}

/// A viewer token without a `jti` claim.
pub fn token_without_jti(subject: &str) -> String {
    let claims = TokenClaims::builder(subject).role("viewer").without_jti().build();
    test_issuer().encode(&claims).expect("token encoded")
}

/// A token without an `iat` claim.
pub fn token_without_iat(subject: &str) -> String {
    let exp = (Utc::now() + Duration::hours(1)).timestamp();
    sign_raw(
        Algorithm::HS256,
        &json!({ "sub": subject, "exp": exp, "jti": format!("{subject}-no-iat"), "roles": ["viewer"] }),
    )
}

/// A correctly signed token using an algorithm the validator does not accept.
pub fn wrong_algorithm_token() -> String {
    let exp = (Utc::now() + Duration::hours(1)).timestamp();
    sign_raw(Algorithm::HS384, &json!({ "sub": "user-384", "exp": exp }))
}

/// Signs arbitrary claims with [`TEST_SECRET`].
pub fn sign_raw(algorithm: Algorithm, claims: &Value) -> String {
    jsonwebtoken::encode(
        &Header::new(algorithm),
        claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("claims encoded")
}

/// Formats an `Authorization` header value.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_auth::TokenRejection;

    #[test]
    fn test_fixture_tokens_behave_as_named() {
        let validator = test_validator();
        assert!(validator.validate(&admin_token().token).is_ok());
        assert_eq!(validator.validate(&expired_token()), Err(TokenRejection::Expired));
        assert_eq!(validator.validate(&wrong_secret_token()), Err(TokenRejection::BadSignature));
        assert_eq!(validator.validate(&wrong_algorithm_token()), Err(TokenRejection::Unsupported));

        let no_jti = validator.validate(&token_without_jti("user-1")).unwrap();
        assert!(no_jti.token_id().is_none());
        let no_iat = validator.validate(&token_without_iat("user-1")).unwrap();
        assert!(no_iat.issued_at().is_none());
    }
}
