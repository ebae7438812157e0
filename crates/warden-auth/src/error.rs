// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the authorization engine.
//!
//! Every ordinary denial path (bad token, wrong password, throttling,
//! revocation, missing permission) is an [`AuthError`] value. Callers match on
//! the variant instead of catching panics, and [`AuthError::status_code`]
//! gives the HTTP status an adapter should surface.

use std::fmt;

use thiserror::Error;

/// Result type alias for authorization operations.
pub type AuthResult<T> = Result<T, AuthError>;

// =============================================================================
// TokenRejection
// =============================================================================

/// Why a bearer token was refused by the validator.
///
/// These are ordinary outcomes, not faults; a strategy chain may fall through
/// to another authenticator on any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenRejection {
    /// Not a structurally valid token (bad segments, bad base64, bad JSON).
    Malformed,
    /// The `exp` claim is in the past.
    Expired,
    /// The `nbf` claim is in the future.
    NotYetValid,
    /// The signature did not verify against the configured key.
    BadSignature,
    /// The `iss` claim does not match the configured issuer.
    IssuerMismatch,
    /// The `aud` claim does not match the configured audience.
    AudienceMismatch,
    /// The `sub` claim is missing or blank.
    MissingSubject,
    /// The `exp` claim is missing.
    MissingExpiry,
    /// The header names an algorithm outside the allow-list.
    Unsupported,
}

impl TokenRejection {
    /// Returns a stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::BadSignature => "bad_signature",
            Self::IssuerMismatch => "issuer_mismatch",
            Self::AudienceMismatch => "audience_mismatch",
            Self::MissingSubject => "missing_subject",
            Self::MissingExpiry => "missing_expiry",
            Self::Unsupported => "unsupported_algorithm",
        }
    }
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Malformed => "Malformed token",
            Self::Expired => "Token has expired",
            Self::NotYetValid => "Token is not yet valid",
            Self::BadSignature => "Invalid token signature",
            Self::IssuerMismatch => "Invalid token issuer",
            Self::AudienceMismatch => "Invalid token audience",
            Self::MissingSubject => "Token has no subject",
            Self::MissingExpiry => "Token has no expiry",
            Self::Unsupported => "Unsupported token algorithm",
        };
        f.write_str(msg)
    }
}

// =============================================================================
// RevocationReason
// =============================================================================

/// Which revocation tier rejected a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevocationReason {
    /// The token's own `jti` was revoked.
    TokenRevoked,
    /// Every token the subject was issued before a cutoff was revoked.
    SessionInvalidated,
}

impl RevocationReason {
    /// Returns a stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TokenRevoked => "token_revoked",
            Self::SessionInvalidated => "session_invalidated",
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenRevoked => f.write_str("Token has been revoked"),
            Self::SessionInvalidated => f.write_str("Session invalidated"),
        }
    }
}

// =============================================================================
// AuthError
// =============================================================================

/// Authorization engine error.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No credentials were presented.
    #[error("Authentication required")]
    Unauthenticated,

    /// The bearer token was refused.
    #[error("{0}")]
    InvalidToken(TokenRejection),

    /// Email or password did not match.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Too many attempts for this key; carries no detail about which counter fired.
    #[error("Too many login attempts")]
    RateLimited,

    /// The token or the subject's session was revoked.
    #[error("{0}")]
    Revoked(RevocationReason),

    /// An authenticated caller lacks the required permission.
    #[error("Permission denied: {action}:{scope}")]
    PermissionDenied {
        /// Denied action.
        action: String,
        /// Denied scope.
        scope: String,
    },

    /// The revocation store could not confirm non-revocation.
    #[error("Cannot confirm token revocation status")]
    RevocationUnavailable,

    /// An infrastructure backend (store, limiter) failed.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A password failed the password policy.
    #[error("Password does not meet requirements: {0}")]
    WeakPassword(String),

    /// A user with this email already exists.
    #[error("User already exists")]
    UserExists,

    /// Invalid input (for example, a malformed email).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Creates a permission-denied error.
    pub fn permission_denied(action: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::PermissionDenied {
            action: action.into(),
            scope: scope.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Creates a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated
            | Self::InvalidToken(_)
            | Self::InvalidCredentials
            | Self::Revoked(_) => 401,
            Self::PermissionDenied { .. } => 403,
            Self::UserExists => 409,
            Self::WeakPassword(_) | Self::InvalidInput(_) => 422,
            Self::RateLimited => 429,
            Self::RevocationUnavailable => 503,
            Self::Backend(_) | Self::InvalidConfig(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns a stable machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::RateLimited => "RATE_LIMITED",
            Self::Revoked(RevocationReason::TokenRevoked) => "TOKEN_REVOKED",
            Self::Revoked(RevocationReason::SessionInvalidated) => "SESSION_INVALIDATED",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::RevocationUnavailable => "REVOCATION_UNAVAILABLE",
            Self::Backend(_) => "BACKEND_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::WeakPassword(_) => "WEAK_PASSWORD",
            Self::UserExists => "USER_EXISTS",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if this is an authentication failure (401).
    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == 401
    }

    /// Returns true if this error comes from infrastructure rather than the caller.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::RevocationUnavailable | Self::Backend(_) | Self::Internal(_)
        )
    }
}

impl From<TokenRejection> for AuthError {
    fn from(rejection: TokenRejection) -> Self {
        Self::InvalidToken(rejection)
    }
}

impl From<RevocationReason> for AuthError {
    fn from(reason: RevocationReason) -> Self {
        Self::Revoked(reason)
    }
}

// =============================================================================
// Tests
// =============================================================================
