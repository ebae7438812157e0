// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema for Warden.
//!
//! ```yaml
//! server:
//!   bind_address: 0.0.0.0
//!   port: 8080
//!
//! auth:
//!   bearer:
//!     secret_key: "${WARDEN_SECRET}"
//!     issuer: warden
//!   rbac:
//!     default_role: viewer
//!   rate_limit:
//!     max_attempts: 5
//!     lockout_threshold: 5
//!
//! logging:
//!   level: info
//!   format: json
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_auth::{AuthConfig, RevocationFailureMode, token::MIN_SECRET_LEN};

use crate::error::{ConfigError, ConfigResult};

/// Default API port.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

// =============================================================================
// WardenConfig
// =============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WardenConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Authorization engine settings.
    pub auth: AuthConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl WardenConfig {
    /// Validates the whole configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.auth.validate()?;
        Ok(())
    }

    /// Returns non-fatal findings about risky but valid settings.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let auth = &self.auth;

        if auth.bearer.is_hmac()
            && auth
                .bearer
                .secret_key
                .as_deref()
                .is_some_and(|s| s.len() < MIN_SECRET_LEN)
        {
            warnings.push(format!(
                "auth.bearer.secret_key is shorter than {MIN_SECRET_LEN} bytes"
            ));
        }
        if auth.bearer.issuer.is_none() {
            warnings.push("auth.bearer.issuer is not set; any issuer is accepted".to_string());
        }
        if auth.bearer.audience.is_none() {
            warnings.push("auth.bearer.audience is not set; any audience is accepted".to_string());
        }
        if !auth.rbac.enabled {
            warnings.push("auth.rbac is disabled; role permissions are not granted".to_string());
        }
        if !auth.rate_limit.enabled {
            warnings.push("auth.rate_limit is disabled; logins are not throttled".to_string());
        }
        if !auth.revocation.enabled {
            warnings.push("auth.revocation is disabled; logout has no effect".to_string());
        } else if auth.revocation.failure_mode == RevocationFailureMode::FailOpen {
            warnings.push(
                "auth.revocation.failure_mode is fail_open; revoked tokens pass while the store is down"
                    .to_string(),
            );
        }
        if auth.public_paths.iter().any(|p| p == "/*") {
            warnings.push("auth.public_paths contains '/*'; every route is public".to_string());
        }
        warnings
    }
}

// =============================================================================
// ServerConfig
// =============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_address: IpAddr,
    /// Listen port.
    pub port: u16,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Grace period for in-flight requests on shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_SERVER_PORT,
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Returns the socket address to bind.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Returns the request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns the shutdown grace period.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Validates the server configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(ConfigError::validation("server.port", "must be non-zero"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::validation(
                "server.request_timeout_secs",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// LoggingConfig
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    pub level: LogLevel,
    /// Log format.
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level as an `EnvFilter` directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parses a level name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    #[default]
    Text,
    /// Compact single-line format.
    Compact,
    /// JSON format for production.
    Json,
}

// =============================================================================
// Tests
// =============================================================================
