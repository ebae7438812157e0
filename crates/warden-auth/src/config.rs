// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::identity::PasswordPolicy;
use crate::rate_limit::RateLimitConfig;
use crate::rbac::RbacConfig;
use crate::token::{BearerConfig, MAX_TOKEN_TTL_SECS};

// =============================================================================
// RevocationConfig
// =============================================================================

/// What the gateway does when the revocation store cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationFailureMode {
    /// Refuse the request with 503.
    #[default]
    FailClosed,
    /// Log at ERROR and treat the token as not revoked.
    FailOpen,
}

/// Revocation checking configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RevocationConfig {
    /// Whether the gateway consults the revocation store.
    pub enabled: bool,
    /// Behavior on store failure or timeout.
    pub failure_mode: RevocationFailureMode,
    /// Per-lookup timeout in milliseconds.
    pub timeout_ms: u64,
    /// Minimum seconds between expiry cleanup passes of the in-memory store.
    pub cleanup_interval_secs: u64,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_mode: RevocationFailureMode::FailClosed,
            timeout_ms: 250,
            cleanup_interval_secs: 60,
        }
    }
}

impl RevocationConfig {
    /// Returns the lookup timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// =============================================================================
// AuthConfig
// =============================================================================

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Paths served without authentication. Exact, or a prefix ending in `*`.
    pub public_paths: Vec<String>,
    /// Bearer token validation.
    pub bearer: BearerConfig,
    /// Role-based access control.
    pub rbac: RbacConfig,
    /// Login throttling, keyed by email.
    pub rate_limit: RateLimitConfig,
    /// Gateway throttling, keyed by client address. Disabled by default.
    pub client_rate_limit: RateLimitConfig,
    /// Revocation checks.
    pub revocation: RevocationConfig,
    /// Password requirements for registration.
    pub password_policy: PasswordPolicy,
    /// Lifetime of tokens issued at login, in seconds.
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            public_paths: vec![
                "/health".to_string(),
                "/docs".to_string(),
                "/openapi.json".to_string(),
            ],
            bearer: BearerConfig::default(),
            rbac: RbacConfig::default(),
            rate_limit: RateLimitConfig::default(),
            client_rate_limit: RateLimitConfig::disabled(),
            revocation: RevocationConfig::default(),
            password_policy: PasswordPolicy::default(),
            token_ttl_secs: 3600,
        }
    }
}

impl AuthConfig {
    /// Creates a configuration with an HMAC bearer secret and defaults elsewhere.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            bearer: BearerConfig::hmac(secret),
            ..Default::default()
        }
    }

    /// Validates every section.
    pub fn validate(&self) -> AuthResult<()> {
        for path in &self.public_paths {
            if !path.starts_with('/') {
                return Err(AuthError::invalid_config(format!(
                    "public_paths: '{path}' must start with '/'"
                )));
            }
            if path.find('*').is_some_and(|i| i != path.len() - 1) {
                return Err(AuthError::invalid_config(format!(
                    "public_paths: '{path}' may only contain '*' as the last character"
                )));
            }
        }

        self.bearer.validate()?;
        self.rbac.validate()?;
        self.rate_limit.validate()?;
        self.client_rate_limit.validate()?;

        if self.revocation.enabled && self.revocation.timeout_ms == 0 {
            return Err(AuthError::invalid_config("revocation.timeout_ms must be > 0"));
        }
        if self.token_ttl_secs == 0 || self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(AuthError::invalid_config(format!(
                "token_ttl_secs must be between 1 and {MAX_TOKEN_TTL_SECS}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.public_paths, vec!["/health", "/docs", "/openapi.json"]);
        assert!(!config.client_rate_limit.enabled);
        assert_eq!(config.revocation.failure_mode, RevocationFailureMode::FailClosed);
        assert!(config.validate().is_err(), "no bearer secret");
        assert!(AuthConfig::with_secret("s".repeat(32)).validate().is_ok());
    }

    #[test]
    fn test_public_path_validation() {
        let mut config = AuthConfig::with_secret("s".repeat(32));
        config.public_paths = vec!["/static/*".into()];
        assert!(config.validate().is_ok());

        config.public_paths = vec!["/a/*/b".into()];
        assert!(config.validate().is_err());

        config.public_paths = vec!["health".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_ttl_bounds() {
        let mut config = AuthConfig::with_secret("s".repeat(32));
        config.token_ttl_secs = MAX_TOKEN_TTL_SECS;
        assert!(config.validate().is_ok());

        config.token_ttl_secs = MAX_TOKEN_TTL_SECS + 1;
        assert!(config.validate().is_err());

        config.token_ttl_secs = 1_000_000_000_000_000;
        assert!(config.validate().is_err());

        config.token_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AuthConfig = serde_json::from_str(
            r#"{
                "bearer": { "secret_key": "x" },
                "revocation": { "failure_mode": "fail_open" },
                "rate_limit": { "lockout_threshold": 5 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.revocation.failure_mode, RevocationFailureMode::FailOpen);
        assert_eq!(config.rate_limit.lockout_threshold, 5);
        assert_eq!(config.rate_limit.max_attempts, 10);
    }
}
