// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # warden-auth
//!
//! Request-time authorization and trust engine.
//!
//! - **Token**: bearer JWT validation into an [`IdentityContext`], and issuance
//! - **Permission / RBAC**: `action:scope` grants, roles and the default role
//! - **RateLimit**: sliding-window attempt counting with optional lockout
//! - **Revocation**: per-token and per-subject cutoff revocation
//! - **Login**: rate-limited credential checks
//! - **Identity**: local accounts with argon2 password hashes
//! - **Gateway**: the per-request pipeline composing all of the above
//!
//! ## Example
//!
//! ```rust,ignore
//! use warden_auth::{AuthConfig, AuthGateway, GatewayRequest};
//!
//! let gateway = AuthGateway::from_config(&AuthConfig::with_secret(secret))?;
//! let decision = gateway
//!     .authorize(&GatewayRequest::new("/api/v1/things").with_authorization(header))
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod clock;
pub mod config;
pub mod error;

// =============================================================================
// Authorization Modules
// =============================================================================

pub mod claims;
pub mod context;
pub mod permission;
pub mod rbac;
pub mod token;

// =============================================================================
// Trust Modules
// =============================================================================

pub mod gateway;
pub mod identity;
pub mod login;
pub mod rate_limit;
pub mod revocation;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthConfig, RevocationConfig, RevocationFailureMode};
pub use error::{AuthError, AuthResult, RevocationReason, TokenRejection};

pub use claims::{TokenClaims, TokenClaimsBuilder};
pub use context::{
    IdentityContext, IdentityContextBuilder, ANONYMOUS_SUBJECT, ISSUER_ANONYMOUS, ISSUER_BEARER,
    ISSUER_IDENTITY,
};
pub use permission::{is_valid_permission, permission_matches, Action, Permission, PermissionSet, Scope};
pub use rbac::{BuiltinRole, RbacConfig, RbacPolicy, RbacPolicyBuilder, RoleDefinition};
pub use token::{is_valid_email, BearerConfig, IssuedToken, TokenIssuer, TokenValidator};

pub use gateway::{
    extract_bearer_token, AuthGateway, AuthGatewayBuilder, GatewayDecision, GatewayRequest,
    PublicPaths,
};
pub use identity::{
    hash_password, verify_password, IdentityProvider, InMemoryUserStore, PasswordPolicy,
    UserRecord, UserStore,
};
pub use login::{login_key, CredentialCheck, LoginGuard};
pub use rate_limit::{
    BucketSnapshot, InMemoryRateLimiter, NoopRateLimiter, RateLimitConfig, RateLimiter,
};
pub use revocation::{InMemoryRevocationStore, RevocationStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
