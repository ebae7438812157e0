// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Claims minted into issued tokens.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims written by [`TokenIssuer`](crate::TokenIssuer).
///
/// Validation never deserializes into this type; it reads the raw payload
/// so that malformed optional claims can be dropped one by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    // =========================================================================
    // Registered claims (RFC 7519)
    // =========================================================================
    /// Subject (user id).
    pub sub: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Not before (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Token id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    // =========================================================================
    // Private claims
    // =========================================================================
    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Role names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    /// Directly granted permission strings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

impl TokenClaims {
    /// Creates claims for `sub` valid for `ttl` from `now`, with a fresh `jti`.
    ///
    /// An expiry beyond the calendar range saturates at its edge.
    pub fn new(sub: impl Into<String>, now: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = now.timestamp();
        let exp = now.checked_add_signed(ttl).unwrap_or(if ttl < Duration::zero() {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        });
        Self {
            sub: sub.into(),
            exp: exp.timestamp(),
            iat,
            nbf: Some(iat),
            iss: None,
            aud: None,
            jti: Some(Uuid::now_v7().to_string()),
            email: None,
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }

    /// Starts a builder.
    pub fn builder(sub: impl Into<String>) -> TokenClaimsBuilder {
        TokenClaimsBuilder::new(sub)
    }

    /// Returns the issue time.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    /// Returns the expiry time.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

// =============================================================================
// TokenClaimsBuilder
// =============================================================================

/// Builder for [`TokenClaims`].
#[derive(Debug, Clone)]
pub struct TokenClaimsBuilder {
    sub: String,
    now: Option<DateTime<Utc>>,
    ttl: Duration,
    iss: Option<String>,
    aud: Option<String>,
    jti: Option<Option<String>>,
    email: Option<String>,
    roles: Vec<String>,
    permissions: Vec<String>,
}

impl TokenClaimsBuilder {
    /// Creates a builder with a one hour lifetime.
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            now: None,
            ttl: Duration::hours(1),
            iss: None,
            aud: None,
            jti: None,
            email: None,
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }

    /// Overrides the issue time.
    pub fn issued_at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Sets the lifetime. Negative values produce an already-expired token.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the issuer.
    pub fn issuer(mut self, iss: impl Into<String>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Sets the audience.
    pub fn audience(mut self, aud: impl Into<String>) -> Self {
        self.aud = Some(aud.into());
        self
    }

    /// Sets an explicit token id.
    pub fn jti(mut self, jti: impl Into<String>) -> Self {
        self.jti = Some(Some(jti.into()));
        self
    }

    /// Omits the token id.
    pub fn without_jti(mut self) -> Self {
        self.jti = Some(None);
        self
    }

    /// Sets the email.
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Adds a role.
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Adds a permission.
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Builds the claims.
    pub fn build(self) -> TokenClaims {
        let mut claims = TokenClaims::new(self.sub, self.now.unwrap_or_else(Utc::now), self.ttl);
        if let Some(jti) = self.jti {
            claims.jti = jti;
        }
        claims.iss = self.iss;
        claims.aud = self.aud;
        claims.email = self.email;
        claims.roles = self.roles;
        claims.permissions = self.permissions;
        claims
    }
}
