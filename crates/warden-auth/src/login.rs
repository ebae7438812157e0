// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Rate-limited interactive login.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::context::IdentityContext;
use crate::error::{AuthError, AuthResult};
use crate::rate_limit::RateLimiter;

/// Verifies an email/password pair.
#[async_trait]
pub trait CredentialCheck: Send + Sync + std::fmt::Debug {
    /// Returns the identity on a match, `None` on a mismatch, an error if the check itself failed.
    async fn verify(&self, email: &str, password: &str) -> AuthResult<Option<IdentityContext>>;
}

/// Normalizes an email into a limiter key.
pub fn login_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Guards a [`CredentialCheck`] with a [`RateLimiter`].
///
/// Check, verify and record run under a per-key async lock, so parallel
/// attempts for one email are serialized and cannot overrun `max_attempts`.
#[derive(Debug, Clone)]
pub struct LoginGuard {
    checker: Arc<dyn CredentialCheck>,
    limiter: Arc<dyn RateLimiter>,
    in_flight: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl LoginGuard {
    /// Creates a guard.
    pub fn new(checker: Arc<dyn CredentialCheck>, limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            checker,
            limiter,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Returns the limiter.
    pub fn limiter(&self) -> &Arc<dyn RateLimiter> {
        &self.limiter
    }

    /// Attempts a login.
    ///
    /// A throttled key is refused with [`AuthError::RateLimited`] before the
    /// password is looked at, so even the correct password is refused.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<IdentityContext> {
        let key = login_key(email);
        let lock = self.in_flight.entry(key.clone()).or_default().clone();
        let _entry = InFlightEntry {
            table: &self.in_flight,
            key: &key,
        };
        let serialized = lock.lock().await;

        let outcome = self.attempt(&key, email, password).await;
        drop(serialized);
        outcome
    }

    async fn attempt(&self, key: &str, email: &str, password: &str) -> AuthResult<IdentityContext> {
        if self.limiter.is_rate_limited(key).await? {
            tracing::warn!(key = %key, "Login refused: too many attempts");
            return Err(AuthError::RateLimited);
        }

        match self.checker.verify(email, password).await? {
            Some(identity) => {
                self.limiter.record_attempt(key, true).await?;
                tracing::info!(subject = identity.subject_id(), "Login succeeded");
                Ok(identity)
            }
            None => {
                self.limiter.record_attempt(key, false).await?;
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

/// Drops a key's lock from the table once no other attempt holds it.
///
/// Runs on drop so a cancelled attempt leaves no entry behind. It is
/// declared after the caller's clone of the lock and before the mutex guard,
/// so it runs once the guard is released and while the clone is still alive.
struct InFlightEntry<'a> {
    table: &'a DashMap<String, Arc<Mutex<()>>>,
    key: &'a str,
}

impl Drop for InFlightEntry<'_> {
    fn drop(&mut self) {
        // One reference in the table, one held by the finishing attempt.
        self.table
            .remove_if(self.key, |_, entry| Arc::strong_count(entry) <= 2);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::rate_limit::{InMemoryRateLimiter, RateLimitConfig};
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct FixedPassword {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CredentialCheck for FixedPassword {
        async fn verify(&self, email: &str, password: &str) -> AuthResult<Option<IdentityContext>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if password == "hang" {
                std::future::pending::<()>().await;
            }
            Ok((password == "correct").then(|| IdentityContext::builder(email).build()))
        }
    }

    fn guard(config: RateLimitConfig) -> (LoginGuard, Arc<ManualClock>, Arc<FixedPassword>) {
        let clock = Arc::new(ManualClock::starting_now());
        let limiter = Arc::new(InMemoryRateLimiter::with_clock(config, clock.clone()));
        let checker = Arc::new(FixedPassword::default());
        (LoginGuard::new(checker.clone(), limiter), clock, checker)
    }

    #[tokio::test]
    async fn test_lockout_refuses_correct_password() {
        let config = RateLimitConfig::default()
            .with_max_attempts(3, 60)
            .with_lockout(3, 300);
        let (guard, clock, _) = guard(config);

        for _ in 0..3 {
            let err = guard.login("alice@example.com", "wrong").await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        let err = guard.login("alice@example.com", "correct").await.unwrap_err();
        assert!(matches!(err, AuthError::RateLimited));
        assert_eq!(err.to_string(), "Too many login attempts");

        assert!(guard.login("bob@example.com", "correct").await.is_ok());

        clock.advance(Duration::seconds(301));
        assert!(guard.login("alice@example.com", "correct").await.is_ok());
    }

    #[tokio::test]
    async fn test_key_is_normalized() {
        let (guard, _, _) = guard(RateLimitConfig::default().with_max_attempts(1, 60));
        let _ = guard.login("Alice@Example.com", "wrong").await;
        let err = guard.login("  alice@example.com ", "correct").await.unwrap_err();
        assert!(matches!(err, AuthError::RateLimited));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_attempts_respect_budget() {
        let (guard, _, checker) = guard(RateLimitConfig::default().with_max_attempts(3, 60));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let guard = guard.clone();
            handles.push(tokio::spawn(async move {
                guard.login("carol@example.com", "wrong").await
            }));
        }
        let mut limited = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), Err(AuthError::RateLimited)) {
                limited += 1;
            }
        }

        assert_eq!(checker.calls.load(Ordering::SeqCst), 3);
        assert_eq!(limited, 17);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_attempt_releases_key() {
        let (guard, _, _) = guard(RateLimitConfig::default());

        let attempt = guard.login("dave@example.com", "hang");
        let cancelled = tokio::time::timeout(std::time::Duration::from_secs(5), attempt).await;
        assert!(cancelled.is_err());
        assert!(guard.in_flight.is_empty());

        assert!(guard.login("dave@example.com", "correct").await.is_ok());
        assert!(guard.in_flight.is_empty());
    }

}
