// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Token and session revocation.
//!
//! Two independent tiers:
//!
//! 1. **Token**: a single `jti` is revoked.
//! 2. **Session**: every token issued to a subject before a cutoff is revoked.
//!
//! Token-level revocation is checked first and wins regardless of the
//! session cutoff.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::error::AuthResult;

// =============================================================================
// RevocationStore
// =============================================================================

/// Storage for revoked tokens and session cutoffs.
///
/// Writes must be visible to every subsequent read. Errors mean "cannot
/// confirm non-revocation" and must never be treated as "not revoked".
#[async_trait]
pub trait RevocationStore: Send + Sync + std::fmt::Debug {
    /// Revokes a single token.
    async fn revoke_token(&self, jti: &str) -> AuthResult<()>;

    /// Revokes a single token, allowing the record to be evicted after `expires_at`.
    async fn revoke_token_until(&self, jti: &str, _expires_at: DateTime<Utc>) -> AuthResult<()> {
        self.revoke_token(jti).await
    }

    /// Revokes every token issued to `subject_id` before `before`.
    async fn revoke_all_user_tokens(&self, subject_id: &str, before: DateTime<Utc>) -> AuthResult<()>;

    /// Returns true if `jti` was revoked.
    async fn is_token_revoked(&self, jti: &str) -> AuthResult<bool>;

    /// Returns true if a token issued to `subject_id` at `issued_at` falls before the cutoff.
    ///
    /// A token without `issued_at` cannot prove it is newer than a cutoff and
    /// counts as revoked once one exists.
    async fn is_session_revoked(
        &self,
        subject_id: &str,
        issued_at: Option<DateTime<Utc>>,
    ) -> AuthResult<bool>;
}

// =============================================================================
// InMemoryRevocationStore
// =============================================================================

/// Single-process revocation store.
///
/// Revoked `jti`s carrying an expiry are evicted by a lazy cleanup pass that
/// runs at most once per cleanup interval. Records are kept for a grace period
/// past expiry so tokens still inside the validator's leeway stay revoked.
#[derive(Debug, Clone)]
pub struct InMemoryRevocationStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    tokens: DashMap<String, Option<DateTime<Utc>>>,
    cutoffs: DashMap<String, DateTime<Utc>>,
    cleanup_interval: Duration,
    retention_grace: Duration,
    last_cleanup: Mutex<DateTime<Utc>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRevocationStore {
    /// Default minimum time between cleanup passes.
    pub const DEFAULT_CLEANUP_INTERVAL_SECS: i64 = 60;
    /// Default retention past a token's expiry.
    pub const DEFAULT_RETENTION_GRACE_SECS: i64 = 300;

    /// Retention grace that outlasts a validator leeway of `leeway_secs`.
    ///
    /// A revoked token is accepted by the validator until `exp + leeway`, so
    /// its record must survive at least that long.
    pub fn retention_grace_for(leeway_secs: u64) -> Duration {
        let leeway = i64::try_from(leeway_secs)
            .ok()
            .and_then(|secs| secs.checked_add(1))
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        leeway.max(Duration::seconds(Self::DEFAULT_RETENTION_GRACE_SECS))
    }

    /// Creates a store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a store on the given clock with default intervals.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_options(
            clock,
            Duration::seconds(Self::DEFAULT_CLEANUP_INTERVAL_SECS),
            Duration::seconds(Self::DEFAULT_RETENTION_GRACE_SECS),
        )
    }

    /// Creates a store with explicit cleanup interval and retention grace.
    pub fn with_options(
        clock: Arc<dyn Clock>,
        cleanup_interval: Duration,
        retention_grace: Duration,
    ) -> Self {
        let now = clock.now();
        Self {
            inner: Arc::new(Inner {
                tokens: DashMap::new(),
                cutoffs: DashMap::new(),
                cleanup_interval,
                retention_grace,
                last_cleanup: Mutex::new(now),
                clock,
            }),
        }
    }

    /// Returns the number of revoked tokens currently held.
    pub fn revoked_token_count(&self) -> usize {
        self.inner.tokens.len()
    }

    /// Returns the session cutoff for `subject_id`.
    pub fn revoked_before(&self, subject_id: &str) -> Option<DateTime<Utc>> {
        self.inner.cutoffs.get(subject_id).map(|c| *c)
    }

    /// Evicts revocations whose tokens have expired. Returns the eviction count.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.inner.clock.now();
        *self.inner.last_cleanup.lock() = now;

        let before = self.inner.tokens.len();
        self.inner
            .tokens
            .retain(|_, expires_at| !self.is_evictable(*expires_at, now));
        let evicted = before.saturating_sub(self.inner.tokens.len());

        if evicted > 0 {
            tracing::debug!(evicted, "Revocation store cleanup");
        }
        evicted
    }

    fn is_evictable(&self, expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        // Past the representable range the record is simply kept.
        expires_at
            .and_then(|exp| exp.checked_add_signed(self.inner.retention_grace))
            .is_some_and(|evict_at| evict_at <= now)
    }

    fn maybe_cleanup(&self) {
        let now = self.inner.clock.now();
        let due = {
            let last = self.inner.last_cleanup.lock();
            now - *last >= self.inner.cleanup_interval
        };
        if due {
            self.cleanup_expired();
        }
    }

    fn insert_token(&self, jti: &str, expires_at: Option<DateTime<Utc>>) {
        self.maybe_cleanup();
        self.inner
            .tokens
            .entry(jti.to_string())
            .and_modify(|existing| {
                // Never shorten: an open-ended revocation stays open-ended.
                *existing = match (*existing, expires_at) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    _ => None,
                };
            })
            .or_insert(expires_at);
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke_token(&self, jti: &str) -> AuthResult<()> {
        self.insert_token(jti, None);
        tracing::info!(jti = %jti, "Token revoked");
        Ok(())
    }

    async fn revoke_token_until(&self, jti: &str, expires_at: DateTime<Utc>) -> AuthResult<()> {
        self.insert_token(jti, Some(expires_at));
        tracing::info!(jti = %jti, expires_at = %expires_at, "Token revoked");
        Ok(())
    }

    async fn revoke_all_user_tokens(&self, subject_id: &str, before: DateTime<Utc>) -> AuthResult<()> {
        let effective = {
            let mut cutoff = self
                .inner
                .cutoffs
                .entry(subject_id.to_string())
                .or_insert(before);
            if before > *cutoff {
                *cutoff = before;
            }
            *cutoff
        };
        tracing::info!(subject = %subject_id, revoked_before = %effective, "Sessions revoked");
        Ok(())
    }

    async fn is_token_revoked(&self, jti: &str) -> AuthResult<bool> {
        self.maybe_cleanup();
        let now = self.inner.clock.now();
        let revoked = self
            .inner
            .tokens
            .get(jti)
            .is_some_and(|expires_at| !self.is_evictable(*expires_at, now));
        Ok(revoked)
    }

    async fn is_session_revoked(
        &self,
        subject_id: &str,
        issued_at: Option<DateTime<Utc>>,
    ) -> AuthResult<bool> {
        let Some(cutoff) = self.revoked_before(subject_id) else {
            return Ok(false);
        };
        Ok(match issued_at {
            Some(issued_at) => issued_at < cutoff,
            None => true,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store() -> (InMemoryRevocationStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (InMemoryRevocationStore::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_revoke_token() {
        let (store, _clock) = store();
        assert!(!store.is_token_revoked("jti-1").await.unwrap());
        store.revoke_token("jti-1").await.unwrap();
        assert!(store.is_token_revoked("jti-1").await.unwrap());
        assert!(!store.is_token_revoked("jti-2").await.unwrap());

        store.revoke_token("jti-1").await.unwrap();
        assert_eq!(store.revoked_token_count(), 1);
    }

    #[tokio::test]
    async fn test_session_cutoff() {
        let (store, clock) = store();
        let cutoff = clock.now();
        store.revoke_all_user_tokens("alice", cutoff).await.unwrap();

        let before = cutoff - Duration::seconds(1);
        assert!(store.is_session_revoked("alice", Some(before)).await.unwrap());
        assert!(!store.is_session_revoked("alice", Some(cutoff)).await.unwrap());
        assert!(!store
            .is_session_revoked("alice", Some(cutoff + Duration::seconds(1)))
            .await
            .unwrap());
        assert!(!store.is_session_revoked("bob", Some(before)).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_issued_at_with_cutoff_is_revoked() {
        let (store, clock) = store();
        assert!(!store.is_session_revoked("alice", None).await.unwrap());
        store.revoke_all_user_tokens("alice", clock.now()).await.unwrap();
        assert!(store.is_session_revoked("alice", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_cutoff_never_moves_backwards() {
        let (store, clock) = store();
        let later = clock.now();
        let earlier = later - Duration::hours(1);
        store.revoke_all_user_tokens("alice", later).await.unwrap();
        store.revoke_all_user_tokens("alice", earlier).await.unwrap();
        assert_eq!(store.revoked_before("alice"), Some(later));
    }

    #[tokio::test]
    async fn test_expired_revocations_are_evicted() {
        let (store, clock) = store();
        let exp = clock.now() + Duration::minutes(10);
        store.revoke_token_until("short", exp).await.unwrap();
        store.revoke_token("forever").await.unwrap();

        clock.advance(Duration::minutes(12));
        assert!(store.is_token_revoked("short").await.unwrap());

        clock.advance(Duration::minutes(4));
        assert!(!store.is_token_revoked("short").await.unwrap());
        assert!(store.is_token_revoked("forever").await.unwrap());
        assert_eq!(store.revoked_token_count(), 1);
    }

    #[test]
    fn test_retention_grace_covers_leeway() {
        let floor = Duration::seconds(InMemoryRevocationStore::DEFAULT_RETENTION_GRACE_SECS);
        assert_eq!(InMemoryRevocationStore::retention_grace_for(30), floor);
        assert_eq!(
            InMemoryRevocationStore::retention_grace_for(600),
            Duration::seconds(601)
        );
        assert_eq!(InMemoryRevocationStore::retention_grace_for(u64::MAX), Duration::MAX);
    }

    #[tokio::test]
    async fn test_revocation_near_calendar_end_is_kept() {
        let (store, clock) = store();
        let exp = DateTime::<Utc>::MAX_UTC - Duration::seconds(10);
        store.revoke_token_until("far", exp).await.unwrap();
        assert!(store.is_token_revoked("far").await.unwrap());

        clock.advance(Duration::minutes(2));
        assert_eq!(store.cleanup_expired(), 0);
        assert!(store.is_token_revoked("far").await.unwrap());
    }

    #[tokio::test]
    async fn test_huge_grace_never_evicts() {
        let clock = Arc::new(ManualClock::starting_now());
        let store = InMemoryRevocationStore::with_options(
            clock.clone(),
            Duration::seconds(1),
            InMemoryRevocationStore::retention_grace_for(u64::MAX),
        );
        store
            .revoke_token_until("jti", clock.now() - Duration::days(1))
            .await
            .unwrap();
        clock.advance(Duration::days(30));
        assert!(store.is_token_revoked("jti").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_ended_revocation_is_not_shortened() {
        let (store, clock) = store();
        store.revoke_token("jti").await.unwrap();
        store
            .revoke_token_until("jti", clock.now() + Duration::seconds(1))
            .await
            .unwrap();
        clock.advance(Duration::days(1));
        assert!(store.is_token_revoked("jti").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_revocation_visible_to_concurrent_readers() {
        let store = InMemoryRevocationStore::new();
        store.revoke_token("shared").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.is_token_revoked("shared").await.unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
    }
}
