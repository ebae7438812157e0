// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-request authorization.
//!
//! [`AuthGateway::authorize`] runs once per inbound call:
//!
//! 1. public path: skip everything, attach the anonymous identity
//! 2. client throttle (when configured): 429
//! 3. bearer token extraction: 401 when absent
//! 4. token validation: 401 on rejection
//! 5. revocation, token tier then session tier: 401, or 503 when the store
//!    cannot answer and the gateway fails closed
//! 6. role enrichment (when RBAC is enabled)
//!
//! Rejections are terminal; nothing is retried.
//!
//! A token without `jti` cannot be revoked individually. It still goes
//! through the session tier, and a subject with a cutoff rejects it when it
//! also lacks `iat`.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;

use crate::clock::SystemClock;
use crate::config::{AuthConfig, RevocationFailureMode};
use crate::context::IdentityContext;
use crate::error::{AuthError, AuthResult, RevocationReason};
use crate::rate_limit::{InMemoryRateLimiter, RateLimiter};
use crate::rbac::RbacPolicy;
use crate::revocation::{InMemoryRevocationStore, RevocationStore};
use crate::token::TokenValidator;

// =============================================================================
// PublicPaths
// =============================================================================

/// Paths that bypass authorization.
///
/// A pattern is either an exact path or a prefix followed by a trailing `*`.
#[derive(Debug, Clone, Default)]
pub struct PublicPaths {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl PublicPaths {
    /// Compiles patterns.
    pub fn new<S: AsRef<str>>(patterns: impl IntoIterator<Item = S>) -> Self {
        let mut paths = Self::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            match pattern.strip_suffix('*') {
                Some(prefix) => paths.prefixes.push(prefix.to_string()),
                None => {
                    paths.exact.insert(pattern.to_string());
                }
            }
        }
        paths
    }

    /// Returns true if `path` is public.
    pub fn matches(&self, path: &str) -> bool {
        self.exact.contains(path) || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

// =============================================================================
// Request / Decision
// =============================================================================

/// The parts of an inbound call the gateway looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct GatewayRequest<'a> {
    /// Request path.
    pub path: &'a str,
    /// Raw `Authorization` header value.
    pub authorization: Option<&'a str>,
    /// Client identifier for throttling, usually the peer address.
    pub client_key: Option<&'a str>,
}

impl<'a> GatewayRequest<'a> {
    /// Creates a request for `path`.
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    /// Sets the `Authorization` header value.
    pub fn with_authorization(mut self, value: &'a str) -> Self {
        self.authorization = Some(value);
        self
    }

    /// Sets the client key.
    pub fn with_client(mut self, key: &'a str) -> Self {
        self.client_key = Some(key);
        self
    }
}

/// Outcome of a successful authorization pass.
#[derive(Debug, Clone)]
pub enum GatewayDecision {
    /// The path is public; the identity is anonymous.
    Public(Arc<IdentityContext>),
    /// A validated, unrevoked identity.
    Authenticated(Arc<IdentityContext>),
}

impl GatewayDecision {
    /// Returns the identity to attach to the call.
    pub fn identity(&self) -> &Arc<IdentityContext> {
        match self {
            Self::Public(identity) | Self::Authenticated(identity) => identity,
        }
    }

    /// Consumes the decision and returns the identity.
    pub fn into_identity(self) -> Arc<IdentityContext> {
        match self {
            Self::Public(identity) | Self::Authenticated(identity) => identity,
        }
    }

    /// Returns true for [`GatewayDecision::Authenticated`].
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

// =============================================================================
// AuthGateway
// =============================================================================

/// Composes validation, revocation and role enrichment.
#[derive(Debug, Clone)]
pub struct AuthGateway {
    public_paths: Arc<PublicPaths>,
    validator: TokenValidator,
    revocation: Option<Arc<dyn RevocationStore>>,
    revocation_timeout: Duration,
    failure_mode: RevocationFailureMode,
    policy: Option<RbacPolicy>,
    client_limiter: Option<Arc<dyn RateLimiter>>,
    anonymous: Arc<IdentityContext>,
}

impl AuthGateway {
    /// Starts a builder around `validator`.
    pub fn builder(validator: TokenValidator) -> AuthGatewayBuilder {
        AuthGatewayBuilder::new(validator)
    }

    /// Builds a gateway with in-memory collaborators from configuration.
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        config.validate()?;
        let validator = TokenValidator::new(config.bearer.clone())?;

        let mut builder = Self::builder(validator)
            .public_paths(PublicPaths::new(&config.public_paths))
            .failure_mode(config.revocation.failure_mode)
            .revocation_timeout(config.revocation.timeout());

        if config.revocation.enabled {
            let interval = ChronoDuration::seconds(
                i64::try_from(config.revocation.cleanup_interval_secs).unwrap_or(i64::MAX / 1000),
            );
            let store = InMemoryRevocationStore::with_options(
                Arc::new(SystemClock),
                interval,
                InMemoryRevocationStore::retention_grace_for(config.bearer.leeway_secs),
            );
            builder = builder.revocation_store(Arc::new(store));
        }
        if config.rbac.enabled {
            builder = builder.policy(RbacPolicy::new(&config.rbac));
        }
        if config.client_rate_limit.enabled {
            let limiter = InMemoryRateLimiter::new(config.client_rate_limit.clone());
            builder = builder.client_limiter(Arc::new(limiter));
        }
        Ok(builder.build())
    }

    /// Returns the token validator.
    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Returns the revocation store, if configured.
    pub fn revocation_store(&self) -> Option<&Arc<dyn RevocationStore>> {
        self.revocation.as_ref()
    }

    /// Returns the RBAC policy, if enrichment is enabled.
    pub fn policy(&self) -> Option<&RbacPolicy> {
        self.policy.as_ref()
    }

    /// Returns true if `path` bypasses authorization.
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.matches(path)
    }

    /// Authorizes one inbound call.
    pub async fn authorize(&self, request: &GatewayRequest<'_>) -> AuthResult<GatewayDecision> {
        if self.public_paths.matches(request.path) {
            tracing::trace!(path = %request.path, "Public path");
            return Ok(GatewayDecision::Public(self.anonymous.clone()));
        }

        let throttle = self.client_limiter.as_ref().zip(request.client_key);
        if let Some((limiter, client)) = throttle {
            if limiter.is_rate_limited(client).await? {
                tracing::warn!(client = %client, path = %request.path, "Request throttled");
                return Err(AuthError::RateLimited);
            }
        }

        match self.authenticate(request.authorization).await {
            Ok(identity) => Ok(GatewayDecision::Authenticated(Arc::new(identity))),
            Err(err) => {
                if err.is_unauthorized() {
                    tracing::warn!(
                        path = %request.path,
                        reason = err.error_code(),
                        "Authentication failed"
                    );
                    if let Some((limiter, client)) = throttle {
                        limiter.record_attempt(client, false).await?;
                    }
                }
                Err(err)
            }
        }
    }

    async fn authenticate(&self, authorization: Option<&str>) -> AuthResult<IdentityContext> {
        let token = authorization
            .and_then(extract_bearer_token)
            .ok_or(AuthError::Unauthenticated)?;
        let identity = self.validator.validate(token)?;
        self.check_revocation(&identity).await?;
        Ok(self.enrich(identity))
    }

    async fn check_revocation(&self, identity: &IdentityContext) -> AuthResult<()> {
        let Some(store) = &self.revocation else {
            return Ok(());
        };

        if let Some(jti) = identity.token_id() {
            match self.bounded(store.is_token_revoked(jti)).await {
                Ok(true) => {
                    tracing::warn!(subject = identity.subject_id(), jti = %jti, "Revoked token presented");
                    return Err(RevocationReason::TokenRevoked.into());
                }
                Ok(false) => {}
                Err(err) => self.on_store_failure("token", &err)?,
            }
        }

        let lookup = store.is_session_revoked(identity.subject_id(), identity.issued_at());
        match self.bounded(lookup).await {
            Ok(true) => {
                tracing::warn!(subject = identity.subject_id(), "Token predates session cutoff");
                Err(RevocationReason::SessionInvalidated.into())
            }
            Ok(false) => Ok(()),
            Err(err) => self.on_store_failure("session", &err),
        }
    }

    async fn bounded<F>(&self, lookup: F) -> AuthResult<bool>
    where
        F: Future<Output = AuthResult<bool>>,
    {
        match tokio::time::timeout(self.revocation_timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::backend(format!(
                "revocation lookup exceeded {}ms",
                self.revocation_timeout.as_millis()
            ))),
        }
    }

    fn on_store_failure(&self, tier: &'static str, err: &AuthError) -> AuthResult<()> {
        match self.failure_mode {
            RevocationFailureMode::FailClosed => {
                tracing::error!(tier, error = %err, "Revocation check failed; refusing request");
                Err(AuthError::RevocationUnavailable)
            }
            RevocationFailureMode::FailOpen => {
                tracing::error!(tier, error = %err, "Revocation check failed; continuing (fail-open)");
                Ok(())
            }
        }
    }

    fn enrich(&self, identity: IdentityContext) -> IdentityContext {
        let Some(policy) = &self.policy else {
            return identity;
        };
        let identity = match policy.default_role() {
            Some(role) => identity.with_fallback_role(role),
            None => identity,
        };
        let granted = policy.permissions_for_roles(identity.roles());
        identity.with_additional_permissions(&granted)
    }
}

// =============================================================================
// AuthGatewayBuilder
// =============================================================================

/// Builder for [`AuthGateway`].
#[derive(Debug)]
pub struct AuthGatewayBuilder {
    gateway: AuthGateway,
}

impl AuthGatewayBuilder {
    /// Default revocation lookup timeout.
    pub const DEFAULT_REVOCATION_TIMEOUT: Duration = Duration::from_millis(250);

    /// Creates a builder with no public paths, no store and no policy.
    pub fn new(validator: TokenValidator) -> Self {
        Self {
            gateway: AuthGateway {
                public_paths: Arc::new(PublicPaths::default()),
                validator,
                revocation: None,
                revocation_timeout: Self::DEFAULT_REVOCATION_TIMEOUT,
                failure_mode: RevocationFailureMode::FailClosed,
                policy: None,
                client_limiter: None,
                anonymous: Arc::new(IdentityContext::anonymous()),
            },
        }
    }

    /// Sets the public paths.
    pub fn public_paths(mut self, paths: PublicPaths) -> Self {
        self.gateway.public_paths = Arc::new(paths);
        self
    }

    /// Enables revocation checks against `store`.
    pub fn revocation_store(mut self, store: Arc<dyn RevocationStore>) -> Self {
        self.gateway.revocation = Some(store);
        self
    }

    /// Sets the revocation lookup timeout.
    pub fn revocation_timeout(mut self, timeout: Duration) -> Self {
        self.gateway.revocation_timeout = timeout;
        self
    }

    /// Sets the revocation failure mode.
    pub fn failure_mode(mut self, mode: RevocationFailureMode) -> Self {
        self.gateway.failure_mode = mode;
        self
    }

    /// Enables role enrichment with `policy` if the policy is enabled.
    pub fn policy(mut self, policy: RbacPolicy) -> Self {
        self.gateway.policy = policy.enabled().then_some(policy);
        self
    }

    /// Throttles callers by client key, counting failed authentications.
    pub fn client_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.gateway.client_limiter = Some(limiter);
        self
    }

    /// Builds the gateway.
    pub fn build(self) -> AuthGateway {
        self.gateway
    }
}

// =============================================================================
// Tests
// =============================================================================
