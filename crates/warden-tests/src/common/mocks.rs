// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Mock collaborators for error injection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use warden_auth::{
    AuthError, AuthResult, CredentialCheck, IdentityContext, InMemoryRevocationStore,
    RateLimiter, RevocationStore,
};

// =============================================================================
// Revocation Stores
// =============================================================================

/// A revocation store whose every call fails.
#[derive(Debug, Default)]
pub struct FailingRevocationStore {
    calls: AtomicUsize,
}

impl FailingRevocationStore {
    /// Creates a new failing store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> AuthResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AuthError::backend("revocation backend offline"))
    }
}

#[async_trait]
impl RevocationStore for FailingRevocationStore {
    async fn revoke_token(&self, _jti: &str) -> AuthResult<()> {
        self.fail()
    }

    async fn revoke_all_user_tokens(&self, _subject_id: &str, _before: DateTime<Utc>) -> AuthResult<()> {
        self.fail()
    }

    async fn is_token_revoked(&self, _jti: &str) -> AuthResult<bool> {
        self.fail()
    }

    async fn is_session_revoked(
        &self,
        _subject_id: &str,
        _issued_at: Option<DateTime<Utc>>,
    ) -> AuthResult<bool> {
        self.fail()
    }
}

/// A revocation store that answers correctly but only after `delay`.
#[derive(Debug, Clone)]
pub struct SlowRevocationStore {
    inner: InMemoryRevocationStore,
    delay: Duration,
}

impl SlowRevocationStore {
    /// Wraps an empty in-memory store.
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryRevocationStore::new(),
            delay,
        }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &InMemoryRevocationStore {
        &self.inner
    }
}

#[async_trait]
impl RevocationStore for SlowRevocationStore {
    async fn revoke_token(&self, jti: &str) -> AuthResult<()> {
        self.inner.revoke_token(jti).await
    }

    async fn revoke_all_user_tokens(&self, subject_id: &str, before: DateTime<Utc>) -> AuthResult<()> {
        self.inner.revoke_all_user_tokens(subject_id, before).await
    }

    async fn is_token_revoked(&self, jti: &str) -> AuthResult<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.is_token_revoked(jti).await
    }

    async fn is_session_revoked(
        &self,
        subject_id: &str,
        issued_at: Option<DateTime<Utc>>,
    ) -> AuthResult<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.is_session_revoked(subject_id, issued_at).await
    }
}

// =============================================================================
// Rate Limiters
// =============================================================================

/// A rate limiter whose backend is unreachable.
#[derive(Debug, Default)]
pub struct FailingRateLimiter;

#[async_trait]
impl RateLimiter for FailingRateLimiter {
    async fn is_rate_limited(&self, _key: &str) -> AuthResult<bool> {
        Err(AuthError::backend("rate limit backend offline"))
    }

    async fn record_attempt(&self, _key: &str, _success: bool) -> AuthResult<()> {
        Err(AuthError::backend("rate limit backend offline"))
    }
}

// =============================================================================
// Credential Checks
// =============================================================================

/// Accepts exactly one email/password pair and counts verifications.
#[derive(Debug)]
pub struct StaticCredentials {
    email: String,
    password: String,
    identity: IdentityContext,
    verifications: AtomicUsize,
}

impl StaticCredentials {
    /// Creates a checker accepting `email`/`password` as `identity`.
    pub fn new(email: &str, password: &str, identity: IdentityContext) -> Arc<Self> {
        Arc::new(Self {
            email: email.to_string(),
            password: password.to_string(),
            identity,
            verifications: AtomicUsize::new(0),
        })
    }

    /// Number of password checks performed.
    pub fn verifications(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialCheck for StaticCredentials {
    async fn verify(&self, email: &str, password: &str) -> AuthResult<Option<IdentityContext>> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        if email.trim().eq_ignore_ascii_case(&self.email) && password == self.password {
            Ok(Some(self.identity.clone()))
        } else {
            Ok(None)
        }
    }
}
