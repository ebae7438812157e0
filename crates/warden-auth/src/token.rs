// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bearer token validation and issuance.
//!
//! [`TokenValidator`] turns a compact JWT into an [`IdentityContext`]. Every
//! bad input is an ordinary [`TokenRejection`]; nothing here panics on
//! attacker-controlled bytes. Optional claims are sanitized one at a time so
//! a malformed `email` or `roles` claim is dropped without failing the token.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use rand::distributions::{Alphanumeric, DistString};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::claims::TokenClaims;
use crate::context::{IdentityContext, IdentityContextBuilder, ISSUER_BEARER};
use crate::error::{AuthError, AuthResult, TokenRejection};
use crate::permission::is_valid_permission;

/// Standard claims copied into [`IdentityContext::metadata`]. Everything else is discarded.
pub const METADATA_CLAIMS: [&str; 6] = ["iss", "aud", "iat", "exp", "jti", "nbf"];

/// Minimum recommended HMAC secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Longest lifetime an issued token may have.
pub const MAX_TOKEN_TTL_SECS: u64 = 366 * 24 * 60 * 60;

const MAX_LOGGED_SUBJECT_LEN: usize = 128;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern is a valid regex")
});

/// Returns true if `email` has a plausible `local@domain.tld` shape.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_PATTERN.is_match(email)
}

// =============================================================================
// BearerConfig
// =============================================================================

/// Bearer token configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BearerConfig {
    /// Shared secret for HMAC algorithms.
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    /// PEM public key for asymmetric algorithms.
    pub public_key: Option<String>,
    /// The only algorithm tokens may be signed with.
    #[serde(with = "algorithm_serde")]
    pub algorithm: Algorithm,
    /// Required `iss`, when set.
    pub issuer: Option<String>,
    /// Required `aud`, when set.
    pub audience: Option<String>,
    /// Clock skew tolerance in seconds for `exp` and `nbf`.
    pub leeway_secs: u64,
}

impl Default for BearerConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            public_key: None,
            algorithm: Algorithm::HS256,
            issuer: None,
            audience: None,
            leeway_secs: 30,
        }
    }
}

impl std::fmt::Debug for BearerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("public_key", &self.public_key.as_ref().map(|_| "<pem>"))
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

impl BearerConfig {
    /// Creates an HS256 configuration with the given secret.
    pub fn hmac(secret: impl Into<String>) -> Self {
        Self {
            secret_key: Some(secret.into()),
            ..Default::default()
        }
    }

    /// Creates an asymmetric configuration with a PEM public key.
    pub fn asymmetric(algorithm: Algorithm, public_key_pem: impl Into<String>) -> Self {
        Self {
            public_key: Some(public_key_pem.into()),
            algorithm,
            ..Default::default()
        }
    }

    /// Sets the required issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the required audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets the leeway.
    pub fn with_leeway(mut self, secs: u64) -> Self {
        self.leeway_secs = secs;
        self
    }

    /// Returns true if the configured algorithm is HMAC.
    pub fn is_hmac(&self) -> bool {
        matches!(
            self.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        )
    }

    /// Fills in a random HMAC secret when none is configured.
    ///
    /// Only for local development: tokens stop validating on restart.
    pub fn ensure_development_secret(&mut self) -> bool {
        if !self.is_hmac() || self.secret_key.as_deref().is_some_and(|s| !s.is_empty()) {
            return false;
        }
        tracing::warn!(
            algorithm = ?self.algorithm,
            "No bearer secret configured; generating an ephemeral development secret"
        );
        self.secret_key = Some(Alphanumeric.sample_string(&mut rand::thread_rng(), 48));
        true
    }

    /// Validates the configuration.
    pub fn validate(&self) -> AuthResult<()> {
        if self.is_hmac() {
            let secret = self.secret_key.as_deref().unwrap_or_default();
            if secret.is_empty() {
                return Err(AuthError::invalid_config(format!(
                    "bearer.secret_key is required for {:?}",
                    self.algorithm
                )));
            }
            if secret.len() < MIN_SECRET_LEN {
                tracing::warn!(
                    min_len = MIN_SECRET_LEN,
                    "Bearer secret is shorter than recommended"
                );
            }
        } else if self.public_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            return Err(AuthError::invalid_config(format!(
                "bearer.public_key is required for {:?}",
                self.algorithm
            )));
        }

        if self.issuer.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(AuthError::invalid_config("bearer.issuer must not be blank"));
        }
        if self.audience.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(AuthError::invalid_config("bearer.audience must not be blank"));
        }
        Ok(())
    }

    fn decoding_key(&self) -> AuthResult<DecodingKey> {
        if self.is_hmac() {
            let secret = self.secret_key.as_deref().unwrap_or_default();
            return Ok(DecodingKey::from_secret(secret.as_bytes()));
        }

        let pem = self.public_key.as_deref().unwrap_or_default().as_bytes();
        let key = match self.algorithm {
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem),
            Algorithm::EdDSA => DecodingKey::from_ed_pem(pem),
            _ => DecodingKey::from_rsa_pem(pem),
        };
        key.map_err(|e| AuthError::invalid_config(format!("bearer.public_key: {e}")))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.algorithms = vec![self.algorithm];
        validation.leeway = self.leeway_secs;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation
    }
}

// =============================================================================
// TokenValidator
// =============================================================================

/// Validates bearer tokens into identity contexts.
#[derive(Clone)]
pub struct TokenValidator {
    config: Arc<BearerConfig>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl TokenValidator {
    /// Creates a validator. Fails if the configuration is unusable.
    pub fn new(config: BearerConfig) -> AuthResult<Self> {
        config.validate()?;
        let decoding_key = config.decoding_key()?;
        let validation = config.validation();

        Ok(Self {
            config: Arc::new(config),
            decoding_key: Arc::new(decoding_key),
            validation: Arc::new(validation),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BearerConfig {
        &self.config
    }

    /// Validates `token` and returns the identity it carries.
    pub fn validate(&self, token: &str) -> Result<IdentityContext, TokenRejection> {
        let claims = match decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)
        {
            Ok(data) => data.claims,
            Err(e) => {
                let rejection = classify(e.kind());
                self.log_rejection(token, rejection);
                return Err(rejection);
            }
        };

        let Some(subject) = claims
            .get("sub")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            tracing::warn!(reason = TokenRejection::MissingSubject.code(), "Token rejected");
            return Err(TokenRejection::MissingSubject);
        };

        let mut builder = IdentityContextBuilder::new(subject).issuer_tag(ISSUER_BEARER);

        if let Some(email) = sanitize_email(claims.get("email")) {
            builder = builder.email(email);
        }
        builder = builder
            .roles(sanitize_roles(claims.get("roles")))
            .permissions(sanitize_permissions(claims.get("permissions")));

        if let Some(issued_at) = claims.get("iat").and_then(timestamp) {
            builder = builder.issued_at(issued_at);
        }
        match claims.get("jti") {
            Some(Value::String(jti)) if !jti.trim().is_empty() => {
                builder = builder.token_id(jti.as_str());
            }
            Some(_) => {
                let subject: String = subject.chars().take(MAX_LOGGED_SUBJECT_LEN).collect();
                tracing::warn!(
                    subject = %subject,
                    "Token carries an unusable jti; it cannot be revoked individually"
                );
            }
            None => {}
        }
        for key in METADATA_CLAIMS {
            if let Some(value) = claims.get(key) {
                builder = builder.metadata(key, value.clone());
            }
        }

        let identity = builder.build();
        tracing::debug!(subject = identity.subject_id(), "Token validated");
        Ok(identity)
    }

    /// Reads `sub` without checking the signature, for log context only.
    fn peek_subject(&self, token: &str) -> Option<String> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &validation).ok()?;
        let subject = data.claims.get("sub")?.as_str()?.trim();
        if subject.is_empty() {
            return None;
        }
        Some(subject.chars().take(MAX_LOGGED_SUBJECT_LEN).collect())
    }

    fn log_rejection(&self, token: &str, rejection: TokenRejection) {
        let subject = self.peek_subject(token);
        match rejection {
            TokenRejection::BadSignature | TokenRejection::Unsupported | TokenRejection::Malformed => {
                tracing::error!(subject = ?subject, reason = rejection.code(), "Token rejected");
            }
            _ => {
                tracing::warn!(subject = ?subject, reason = rejection.code(), "Token rejected");
            }
        }
    }
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("algorithm", &self.config.algorithm)
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish()
    }
}

fn classify(kind: &ErrorKind) -> TokenRejection {
    match kind {
        ErrorKind::ExpiredSignature => TokenRejection::Expired,
        ErrorKind::ImmatureSignature => TokenRejection::NotYetValid,
        ErrorKind::InvalidSignature => TokenRejection::BadSignature,
        ErrorKind::InvalidIssuer => TokenRejection::IssuerMismatch,
        ErrorKind::InvalidAudience => TokenRejection::AudienceMismatch,
        ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenRejection::Unsupported
        }
        ErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
            "sub" => TokenRejection::MissingSubject,
            "exp" => TokenRejection::MissingExpiry,
            "iss" => TokenRejection::IssuerMismatch,
            "aud" => TokenRejection::AudienceMismatch,
            _ => TokenRejection::Malformed,
        },
        _ => TokenRejection::Malformed,
    }
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let secs = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))?;
    DateTime::from_timestamp(secs, 0)
}

fn sanitize_email(value: Option<&Value>) -> Option<String> {
    let value = value?;
    match value.as_str().map(str::trim) {
        Some(email) if is_valid_email(email) => Some(email.to_string()),
        _ => {
            tracing::debug!("Dropping malformed email claim");
            None
        }
    }
}

fn sanitize_roles(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect(),
        Some(_) => {
            tracing::debug!("Dropping non-list roles claim");
            Vec::new()
        }
    }
}

fn sanitize_permissions(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|p| is_valid_permission(p))
            .map(str::to_string)
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            tracing::debug!("Dropping non-list permissions claim");
            Vec::new()
        }
    }
}

// =============================================================================
// TokenIssuer
// =============================================================================

/// A freshly minted token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact JWT.
    pub token: String,
    /// Token id.
    pub jti: Option<String>,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

/// Mints bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: Arc<EncodingKey>,
    algorithm: Algorithm,
    issuer: Option<String>,
    audience: Option<String>,
    ttl: Duration,
}

impl TokenIssuer {
    /// Creates an issuer from an HMAC bearer configuration.
    pub fn new(config: &BearerConfig, ttl: Duration) -> AuthResult<Self> {
        if !config.is_hmac() {
            return Err(AuthError::invalid_config(
                "token issuance from configuration requires an HMAC algorithm",
            ));
        }
        config.validate()?;
        if ttl <= Duration::zero() || ttl.num_seconds() as u64 > MAX_TOKEN_TTL_SECS {
            return Err(AuthError::invalid_config(format!(
                "token lifetime must be between 1 and {MAX_TOKEN_TTL_SECS} seconds"
            )));
        }
        let secret = config.secret_key.as_deref().unwrap_or_default();

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            algorithm: config.algorithm,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl,
        })
    }

    /// Creates an issuer with an explicit signing key.
    pub fn with_encoding_key(key: EncodingKey, algorithm: Algorithm, ttl: Duration) -> Self {
        Self {
            encoding_key: Arc::new(key),
            algorithm,
            issuer: None,
            audience: None,
            ttl,
        }
    }

    /// Returns the token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Encodes `claims` as-is.
    pub fn encode(&self, claims: &TokenClaims) -> AuthResult<String> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("Failed to sign token: {e}")))
    }

    /// Issues a token for an identity, stamping issuer, audience and a fresh `jti`.
    pub fn issue(&self, identity: &IdentityContext) -> AuthResult<IssuedToken> {
        self.issue_at(identity, Utc::now())
    }

    /// Issues a token as of `now`.
    pub fn issue_at(&self, identity: &IdentityContext, now: DateTime<Utc>) -> AuthResult<IssuedToken> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::internal("token expiry is out of range"))?;
        let mut claims = TokenClaims::new(identity.subject_id(), now, self.ttl);
        claims.iss = self.issuer.clone();
        claims.aud = self.audience.clone();
        claims.email = identity.email().map(str::to_string);
        claims.roles = identity.roles().iter().cloned().collect();
        claims.permissions = identity.permissions().iter().map(str::to_string).collect();

        let token = self.encode(&claims)?;
        Ok(IssuedToken {
            token,
            jti: claims.jti,
            issued_at: DateTime::from_timestamp(claims.iat, 0).unwrap_or(now),
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or(expires_at),
        })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}

// =============================================================================
// Algorithm Serialization
// =============================================================================

mod algorithm_serde {
    use jsonwebtoken::Algorithm;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(algorithm: &Algorithm, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{algorithm:?}"))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Algorithm, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<Algorithm>()
            .map_err(|_| serde::de::Error::custom(format!("Unknown algorithm: {s}")))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "test-secret-key-that-is-long-enough-for-testing";

    fn validator() -> TokenValidator {
        TokenValidator::new(BearerConfig::hmac(SECRET)).unwrap()
    }

    fn sign(payload: Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn future() -> i64 {
        Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_valid_token() {
        let iat = Utc::now().timestamp();
        let token = sign(json!({
            "sub": "user-1",
            "exp": future(),
            "iat": iat,
            "jti": "abc",
            "email": "alice@example.com",
            "roles": ["editor"],
            "permissions": ["read:Billing"],
        }));

        let identity = validator().validate(&token).unwrap();
        assert_eq!(identity.subject_id(), "user-1");
        assert_eq!(identity.email(), Some("alice@example.com"));
        assert!(identity.has_role("editor"));
        assert!(identity.permissions().contains("read:Billing"));
        assert_eq!(identity.token_id(), Some("abc"));
        assert_eq!(identity.issued_at().map(|t| t.timestamp()), Some(iat));
        assert_eq!(identity.issuer_tag(), "bearer");
    }

    #[test]
    fn test_missing_or_blank_subject() {
        let v = validator();
        let missing = sign(json!({ "exp": future() }));
        assert_eq!(v.validate(&missing).unwrap_err(), TokenRejection::MissingSubject);

        for blank in ["", "   ", "\t"] {
            let token = sign(json!({ "sub": blank, "exp": future() }));
            assert_eq!(v.validate(&token).unwrap_err(), TokenRejection::MissingSubject);
        }

        let numeric = sign(json!({ "sub": 42, "exp": future() }));
        assert_eq!(v.validate(&numeric).unwrap_err(), TokenRejection::MissingSubject);
    }

    #[test]
    fn test_missing_expiry() {
        let token = sign(json!({ "sub": "u" }));
        assert_eq!(validator().validate(&token).unwrap_err(), TokenRejection::MissingExpiry);
    }

    #[test]
    fn test_expired_token() {
        let token = sign(json!({ "sub": "u", "exp": Utc::now().timestamp() - 3600 }));
        assert_eq!(validator().validate(&token).unwrap_err(), TokenRejection::Expired);
    }

    #[test]
    fn test_not_yet_valid() {
        let token = sign(json!({ "sub": "u", "exp": future(), "nbf": future() - 60 }));
        assert_eq!(validator().validate(&token).unwrap_err(), TokenRejection::NotYetValid);
    }

    #[test]
    fn test_wrong_secret() {
        let other = TokenValidator::new(BearerConfig::hmac("another-secret-that-is-long-enough-too")).unwrap();
        let token = sign(json!({ "sub": "u", "exp": future() }));
        assert_eq!(other.validate(&token).unwrap_err(), TokenRejection::BadSignature);
    }

    #[test]
    fn test_garbage_never_panics() {
        let v = validator();
        for garbage in ["", "abc", "a.b.c", "....", "eyJhbGciOiJIUzI1NiJ9..", "é.é.é"] {
            assert!(v.validate(garbage).is_err(), "{garbage:?}");
        }
    }

    #[test]
    fn test_algorithm_allow_list() {
        let token = encode(
            &Header::new(Algorithm::HS512),
            &json!({ "sub": "u", "exp": future() }),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(validator().validate(&token).unwrap_err(), TokenRejection::Unsupported);
    }

    #[test]
    fn test_issuer_and_audience() {
        let v = TokenValidator::new(
            BearerConfig::hmac(SECRET)
                .with_issuer("warden")
                .with_audience("api"),
        )
        .unwrap();

        let good = sign(json!({ "sub": "u", "exp": future(), "iss": "warden", "aud": "api" }));
        assert!(v.validate(&good).is_ok());

        let bad_iss = sign(json!({ "sub": "u", "exp": future(), "iss": "other", "aud": "api" }));
        assert_eq!(v.validate(&bad_iss).unwrap_err(), TokenRejection::IssuerMismatch);

        let bad_aud = sign(json!({ "sub": "u", "exp": future(), "iss": "warden", "aud": "web" }));
        assert_eq!(v.validate(&bad_aud).unwrap_err(), TokenRejection::AudienceMismatch);
    }

    #[test]
    fn test_audience_ignored_when_not_configured() {
        let token = sign(json!({ "sub": "u", "exp": future(), "aud": "anything" }));
        assert!(validator().validate(&token).is_ok());
    }

    #[test]
    fn test_claim_sanitization_is_fail_soft() {
        let token = sign(json!({
            "sub": "u",
            "exp": future(),
            "email": "not-an-email",
            "roles": ["admin", 7, "  ", null, " editor "],
            "permissions": ["read:Billing", "read Billing", 3, "*:*", "drop:table"],
        }));
        let identity = validator().validate(&token).unwrap();
        assert_eq!(identity.email(), None);
        let roles: Vec<&str> = identity.roles().iter().map(String::as_str).collect();
        assert_eq!(roles, vec!["admin", "editor"]);
        let perms: Vec<&str> = identity.permissions().iter().collect();
        assert_eq!(perms, vec!["*:*", "read:Billing"]);

        let token = sign(json!({ "sub": "u", "exp": future(), "roles": "admin", "permissions": "*:*" }));
        let identity = validator().validate(&token).unwrap();
        assert!(identity.roles().is_empty());
        assert!(identity.permissions().is_empty());
    }

    #[test]
    fn test_metadata_allow_list() {
        let token = sign(json!({
            "sub": "u",
            "exp": future(),
            "jti": "j1",
            "password": "hunter2",
            "ssn": "000-00-0000",
        }));
        let identity = validator().validate(&token).unwrap();
        let keys: Vec<&str> = identity.metadata().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["exp", "jti"]);
    }

    #[test]
    fn test_issuer_round_trip() {
        let config = BearerConfig::hmac(SECRET).with_issuer("warden");
        let issuer = TokenIssuer::new(&config, Duration::minutes(10)).unwrap();
        let v = TokenValidator::new(config).unwrap();

        let identity = IdentityContext::builder("user-9")
            .email("bob@example.com")
            .role("viewer")
            .build();
        let issued = issuer.issue(&identity).unwrap();
        let validated = v.validate(&issued.token).unwrap();

        assert_eq!(validated.subject_id(), "user-9");
        assert_eq!(validated.token_id(), issued.jti.as_deref());
        assert!(validated.has_role("viewer"));
        assert_eq!(validated.metadata().get("iss"), Some(&json!("warden")));
    }

    #[test]
    fn test_issuer_lifetime_bounds() {
        let config = BearerConfig::hmac(SECRET);
        let max = Duration::seconds(MAX_TOKEN_TTL_SECS as i64);
        assert!(TokenIssuer::new(&config, max).is_ok());
        assert!(TokenIssuer::new(&config, max + Duration::seconds(1)).is_err());
        assert!(TokenIssuer::new(&config, Duration::seconds(1_000_000_000_000_000)).is_err());
        assert!(TokenIssuer::new(&config, Duration::zero()).is_err());
    }

    #[test]
    fn test_issue_near_calendar_end_is_an_error() {
        let issuer = TokenIssuer::new(&BearerConfig::hmac(SECRET), Duration::hours(1)).unwrap();
        let identity = IdentityContext::builder("user-1").build();
        let late = DateTime::<Utc>::MAX_UTC - Duration::minutes(1);
        assert!(matches!(
            issuer.issue_at(&identity, late),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn test_unusable_jti_is_dropped() {
        for jti in [json!(42), json!("  "), json!(["a"])] {
            let token = sign(json!({"sub": "u", "exp": future(), "jti": jti}));
            let identity = validator().validate(&token).unwrap();
            assert_eq!(identity.token_id(), None);
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(BearerConfig::default().validate().is_err());
        assert!(BearerConfig::hmac("").validate().is_err());
        assert!(BearerConfig::hmac("short").validate().is_ok());
        assert!(BearerConfig { algorithm: Algorithm::RS256, ..Default::default() }
            .validate()
            .is_err());
        assert!(TokenIssuer::new(
            &BearerConfig::asymmetric(Algorithm::RS256, "pem"),
            Duration::minutes(1)
        )
        .is_err());
    }

    #[test]
    fn test_development_secret() {
        let mut config = BearerConfig::default();
        assert!(config.ensure_development_secret());
        assert!(config.validate().is_ok());
        assert!(!config.ensure_development_secret());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", BearerConfig::hmac(SECRET));
        assert!(!rendered.contains(SECRET));
    }

    #[test]
    fn test_algorithm_serde() {
        let config: BearerConfig =
            serde_json::from_str(r#"{"secret_key": "s", "algorithm": "HS384"}"#).unwrap();
        assert_eq!(config.algorithm, Algorithm::HS384);
        assert!(serde_json::from_str::<BearerConfig>(r#"{"algorithm": "none"}"#).is_err());
    }
}
