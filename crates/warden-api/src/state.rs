// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Application state shared across handlers.

use std::sync::Arc;

use warden_auth::{
    AuthConfig, AuthError, AuthGateway, AuthResult, BuiltinRole, IdentityProvider, InMemoryRateLimiter,
    InMemoryUserStore, LoginGuard, NoopRateLimiter, PasswordPolicy, RateLimitConfig, RateLimiter,
    RbacPolicy, TokenIssuer, UserStore,
};

/// Routes served without a bearer token in addition to the configured public paths.
pub const API_PUBLIC_PATHS: [&str; 3] = ["/health", "/api/v1/auth/login", "/api/v1/auth/register"];

// =============================================================================
// AppState
// =============================================================================

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Request authorization pipeline.
    pub gateway: Arc<AuthGateway>,
    /// Policy used for per-route permission checks.
    pub rbac_policy: Arc<RbacPolicy>,
    /// Throttled credential check.
    pub login: LoginGuard,
    /// Local account registry.
    pub identity: IdentityProvider,
    /// Token issuer. `None` when the bearer key cannot sign.
    pub issuer: Option<Arc<TokenIssuer>>,
    /// Roles granted to self-registered accounts.
    pub registration_roles: Arc<Vec<String>>,
    /// `Retry-After` hint for throttled logins, in seconds.
    pub login_retry_after_secs: u64,
    /// `Retry-After` hint for throttled clients, in seconds.
    pub client_retry_after_secs: Option<u64>,
}

impl AppState {
    /// Creates a new app state builder.
    pub fn builder(gateway: Arc<AuthGateway>) -> AppStateBuilder {
        AppStateBuilder::new(gateway)
    }

    /// Builds the state with in-memory stores from configuration.
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        let mut config = config.clone();
        for path in API_PUBLIC_PATHS {
            if !config.public_paths.iter().any(|p| p == path) {
                config.public_paths.push(path.to_string());
            }
        }

        let gateway = Arc::new(AuthGateway::from_config(&config)?);

        let issuer = if config.bearer.is_hmac() {
            let ttl = i64::try_from(config.token_ttl_secs)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .ok_or_else(|| AuthError::invalid_config("token_ttl_secs is out of range"))?;
            Some(Arc::new(TokenIssuer::new(&config.bearer, ttl)?))
        } else {
            tracing::warn!("Bearer key cannot sign; login is disabled");
            None
        };

        let limiter: Arc<dyn RateLimiter> = if config.rate_limit.enabled {
            Arc::new(InMemoryRateLimiter::new(config.rate_limit.clone()))
        } else {
            Arc::new(NoopRateLimiter)
        };

        let mut builder = Self::builder(gateway)
            .rbac_policy(RbacPolicy::new(&config.rbac))
            .password_policy(config.password_policy.clone())
            .login_limiter(limiter)
            .login_retry_after_secs(retry_after(&config.rate_limit));
        if let Some(issuer) = issuer {
            builder = builder.issuer(issuer);
        }
        if config.client_rate_limit.enabled {
            builder = builder.client_retry_after_secs(config.client_rate_limit.window_seconds);
        }
        builder.build()
    }

    /// Returns the token issuer if available.
    pub fn issuer(&self) -> Option<&Arc<TokenIssuer>> {
        self.issuer.as_ref()
    }
}

/// The longest a throttled caller may have to wait.
fn retry_after(config: &RateLimitConfig) -> u64 {
    if config.lockout_threshold > 0 {
        config.window_seconds.max(config.lockout_duration_seconds)
    } else {
        config.window_seconds
    }
}

// =============================================================================
// AppStateBuilder
// =============================================================================

/// Builder for constructing AppState.
pub struct AppStateBuilder {
    gateway: Arc<AuthGateway>,
    rbac_policy: Option<RbacPolicy>,
    issuer: Option<Arc<TokenIssuer>>,
    user_store: Option<Arc<dyn UserStore>>,
    password_policy: PasswordPolicy,
    login_limiter: Option<Arc<dyn RateLimiter>>,
    login_retry_after_secs: u64,
    client_retry_after_secs: Option<u64>,
}

impl AppStateBuilder {
    /// Creates a new builder.
    pub fn new(gateway: Arc<AuthGateway>) -> Self {
        Self {
            gateway,
            rbac_policy: None,
            issuer: None,
            user_store: None,
            password_policy: PasswordPolicy::default(),
            login_limiter: None,
            login_retry_after_secs: 60,
            client_retry_after_secs: None,
        }
    }

    /// Sets the policy used for per-route checks.
    ///
    /// Defaults to the gateway's policy, or the built-in roles.
    pub fn rbac_policy(mut self, policy: RbacPolicy) -> Self {
        self.rbac_policy = Some(policy);
        self
    }

    /// Sets the token issuer.
    pub fn issuer(mut self, issuer: Arc<TokenIssuer>) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// Sets the user store. Defaults to an in-memory store.
    pub fn user_store(mut self, store: Arc<dyn UserStore>) -> Self {
        self.user_store = Some(store);
        self
    }

    /// Sets the password policy for registration.
    pub fn password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    /// Sets the login limiter. Defaults to no throttling.
    pub fn login_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.login_limiter = Some(limiter);
        self
    }

    /// Sets the `Retry-After` hint for throttled logins.
    pub fn login_retry_after_secs(mut self, seconds: u64) -> Self {
        self.login_retry_after_secs = seconds;
        self
    }

    /// Sets the `Retry-After` hint for throttled clients.
    pub fn client_retry_after_secs(mut self, seconds: u64) -> Self {
        self.client_retry_after_secs = Some(seconds);
        self
    }

    /// Builds the AppState.
    pub fn build(self) -> AuthResult<AppState> {
        let rbac_policy = self
            .rbac_policy
            .or_else(|| self.gateway.policy().cloned())
            .unwrap_or_default();
        let registration_role = rbac_policy
            .default_role()
            .unwrap_or(BuiltinRole::Viewer.as_str())
            .to_string();

        let store = self
            .user_store
            .unwrap_or_else(|| Arc::new(InMemoryUserStore::new()));
        let identity = IdentityProvider::new(store, self.password_policy)?;
        let limiter = self
            .login_limiter
            .unwrap_or_else(|| Arc::new(NoopRateLimiter));
        let login = LoginGuard::new(Arc::new(identity.clone()), limiter);

        Ok(AppState {
            gateway: self.gateway,
            rbac_policy: Arc::new(rbac_policy),
            login,
            identity,
            issuer: self.issuer,
            registration_roles: Arc::new(vec![registration_role]),
            login_retry_after_secs: self.login_retry_after_secs,
            client_retry_after_secs: self.client_retry_after_secs,
        })
    }
}
