// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Attempt throttling with lockout.
//!
//! Each key (an email, a client address) owns a bucket with two states:
//!
//! - **Normal**: attempts inside the trailing window are counted and the key is
//!   throttled once the count reaches `max_attempts`.
//! - **Locked**: entered after `lockout_threshold` consecutive failures; every
//!   attempt is refused until `locked_until`, then the bucket resets lazily on
//!   the next access.
//!
//! A success resets the failure streak and clears the window.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::{AuthError, AuthResult};

// =============================================================================
// RateLimitConfig
// =============================================================================

/// Rate limiting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// When false every attempt is allowed.
    pub enabled: bool,
    /// Attempts allowed per window.
    pub max_attempts: u32,
    /// Sliding window length in seconds.
    pub window_seconds: u64,
    /// Consecutive failures that trigger a lockout. 0 disables lockout.
    pub lockout_threshold: u32,
    /// Lockout length in seconds.
    pub lockout_duration_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 10,
            window_seconds: 60,
            lockout_threshold: 0,
            lockout_duration_seconds: 300,
        }
    }
}

impl RateLimitConfig {
    /// Creates a disabled configuration.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Sets the attempt budget per window.
    pub fn with_max_attempts(mut self, max_attempts: u32, window_seconds: u64) -> Self {
        self.max_attempts = max_attempts;
        self.window_seconds = window_seconds;
        self
    }

    /// Enables lockout after `threshold` consecutive failures.
    pub fn with_lockout(mut self, threshold: u32, duration_seconds: u64) -> Self {
        self.lockout_threshold = threshold;
        self.lockout_duration_seconds = duration_seconds;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> AuthResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.max_attempts == 0 {
            return Err(AuthError::invalid_config("rate_limit.max_attempts must be > 0"));
        }
        if self.window_seconds == 0 {
            return Err(AuthError::invalid_config("rate_limit.window_seconds must be > 0"));
        }
        if self.lockout_threshold > 0 && self.lockout_duration_seconds == 0 {
            return Err(AuthError::invalid_config(
                "rate_limit.lockout_duration_seconds must be > 0 when lockout is enabled",
            ));
        }
        Ok(())
    }

    fn window(&self) -> Duration {
        seconds(self.window_seconds)
    }

    fn lockout(&self) -> Duration {
        seconds(self.lockout_duration_seconds)
    }
}

/// Longest configurable span, about a century.
const MAX_SPAN_SECS: u64 = 100 * 365 * 24 * 3600;

fn seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_SPAN_SECS) as i64)
}

// =============================================================================
// RateLimiter
// =============================================================================

/// Per-key attempt throttling.
///
/// Backends report failures as errors; callers must not treat an error as "allowed".
#[async_trait]
pub trait RateLimiter: Send + Sync + std::fmt::Debug {
    /// Returns true if the next attempt for `key` must be refused.
    async fn is_rate_limited(&self, key: &str) -> AuthResult<bool>;

    /// Records the outcome of an attempt for `key`.
    async fn record_attempt(&self, key: &str, success: bool) -> AuthResult<()>;
}

// =============================================================================
// InMemoryRateLimiter
// =============================================================================

#[derive(Debug, Default)]
struct Bucket {
    attempts: VecDeque<DateTime<Utc>>,
    consecutive_failures: u32,
    locked_until: Option<DateTime<Utc>>,
}

impl Bucket {
    /// Unlocks an expired lockout and drops attempts older than the window.
    fn refresh(&mut self, now: DateTime<Utc>, window: Duration) {
        if self.locked_until.is_some_and(|until| now >= until) {
            self.locked_until = None;
            self.consecutive_failures = 0;
            self.attempts.clear();
        }
        let cutoff = now - window;
        while self.attempts.front().is_some_and(|t| *t <= cutoff) {
            self.attempts.pop_front();
        }
    }

    fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }
}

/// Snapshot of a key's limiter state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSnapshot {
    /// Attempts inside the current window.
    pub attempts_in_window: usize,
    /// Current failure streak.
    pub consecutive_failures: u32,
    /// End of the active lockout.
    pub locked_until: Option<DateTime<Utc>>,
}

/// Single-process sliding-window limiter.
///
/// Every read-modify-write on a bucket runs while holding that key's map
/// entry, so parallel attempts for one key cannot lose updates.
#[derive(Debug, Clone)]
pub struct InMemoryRateLimiter {
    config: Arc<RateLimitConfig>,
    buckets: Arc<DashMap<String, Bucket>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRateLimiter {
    /// Creates a limiter on the system clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a limiter on the given clock.
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(config),
            buckets: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Returns the number of tracked keys.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }

    /// Clears all state for `key`, including an active lockout.
    pub fn reset(&self, key: &str) {
        if self.buckets.remove(key).is_some() {
            tracing::info!(key = %key, "Rate limit state reset");
        }
    }

    /// Returns the current state for `key` without creating a bucket.
    pub fn snapshot(&self, key: &str) -> Option<BucketSnapshot> {
        let now = self.clock.now();
        let mut bucket = self.buckets.get_mut(key)?;
        bucket.refresh(now, self.config.window());
        Some(BucketSnapshot {
            attempts_in_window: bucket.attempts.len(),
            consecutive_failures: bucket.consecutive_failures,
            locked_until: bucket.locked_until,
        })
    }

    fn check(&self, key: &str) -> bool {
        if !self.config.enabled {
            return false;
        }
        let now = self.clock.now();
        let Some(mut bucket) = self.buckets.get_mut(key) else {
            return false;
        };
        bucket.refresh(now, self.config.window());

        bucket.is_locked(now) || bucket.attempts.len() >= self.config.max_attempts as usize
    }

    fn record(&self, key: &str, success: bool) {
        if !self.config.enabled {
            return;
        }
        let now = self.clock.now();
        let mut bucket = self.buckets.entry(key.to_string()).or_default();
        bucket.refresh(now, self.config.window());

        if success {
            bucket.consecutive_failures = 0;
            bucket.attempts.clear();
            return;
        }

        bucket.attempts.push_back(now);
        bucket.consecutive_failures = bucket.consecutive_failures.saturating_add(1);

        let threshold = self.config.lockout_threshold;
        if threshold > 0 && bucket.consecutive_failures >= threshold && !bucket.is_locked(now) {
            let until = now + self.config.lockout();
            bucket.locked_until = Some(until);
            tracing::warn!(
                key = %key,
                consecutive_failures = bucket.consecutive_failures,
                locked_until = %until,
                "Lockout triggered"
            );
        }
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn is_rate_limited(&self, key: &str) -> AuthResult<bool> {
        Ok(self.check(key))
    }

    async fn record_attempt(&self, key: &str, success: bool) -> AuthResult<()> {
        self.record(key, success);
        Ok(())
    }
}

/// A limiter that never throttles.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRateLimiter;

#[async_trait]
impl RateLimiter for NoopRateLimiter {
    async fn is_rate_limited(&self, _key: &str) -> AuthResult<bool> {
        Ok(false)
    }

    async fn record_attempt(&self, _key: &str, _success: bool) -> AuthResult<()> {
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(config: RateLimitConfig) -> (InMemoryRateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (InMemoryRateLimiter::with_clock(config, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_window_limit() {
        let (limiter, clock) = limiter(RateLimitConfig::default().with_max_attempts(3, 60));
        for _ in 0..3 {
            assert!(!limiter.is_rate_limited("k").await.unwrap());
            limiter.record_attempt("k", false).await.unwrap();
        }
        assert!(limiter.is_rate_limited("k").await.unwrap());

        clock.advance(Duration::seconds(61));
        assert!(!limiter.is_rate_limited("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_window_slides() {
        let (limiter, clock) = limiter(RateLimitConfig::default().with_max_attempts(2, 60));
        limiter.record_attempt("k", false).await.unwrap();
        clock.advance(Duration::seconds(40));
        limiter.record_attempt("k", false).await.unwrap();
        assert!(limiter.is_rate_limited("k").await.unwrap());

        clock.advance(Duration::seconds(21));
        assert!(!limiter.is_rate_limited("k").await.unwrap());
        assert_eq!(limiter.snapshot("k").unwrap().attempts_in_window, 1);
    }

    #[tokio::test]
    async fn test_lockout_outlasts_window() {
        let config = RateLimitConfig::default()
            .with_max_attempts(100, 10)
            .with_lockout(3, 300);
        let (limiter, clock) = limiter(config);
        for _ in 0..3 {
            limiter.record_attempt("k", false).await.unwrap();
        }
        assert!(limiter.is_rate_limited("k").await.unwrap());

        clock.advance(Duration::seconds(120));
        assert!(limiter.is_rate_limited("k").await.unwrap());

        clock.advance(Duration::seconds(180));
        assert!(!limiter.is_rate_limited("k").await.unwrap());
        let snapshot = limiter.snapshot("k").unwrap();
        assert_eq!(snapshot.consecutive_failures, 0);
        assert_eq!(snapshot.locked_until, None);
    }

    #[tokio::test]
    async fn test_success_resets_streak() {
        let config = RateLimitConfig::default()
            .with_max_attempts(10, 60)
            .with_lockout(5, 300);
        let (limiter, _clock) = limiter(config);
        for _ in 0..4 {
            limiter.record_attempt("k", false).await.unwrap();
        }
        limiter.record_attempt("k", true).await.unwrap();
        for _ in 0..4 {
            limiter.record_attempt("k", false).await.unwrap();
        }
        assert!(!limiter.is_rate_limited("k").await.unwrap());
        assert_eq!(limiter.snapshot("k").unwrap().consecutive_failures, 4);
    }

    #[tokio::test]
    async fn test_zero_threshold_never_locks() {
        let (limiter, _clock) = limiter(RateLimitConfig::default().with_max_attempts(1000, 60));
        for _ in 0..50 {
            limiter.record_attempt("k", false).await.unwrap();
        }
        assert_eq!(limiter.snapshot("k").unwrap().locked_until, None);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (limiter, _clock) = limiter(RateLimitConfig::default().with_max_attempts(1, 60));
        limiter.record_attempt("a", false).await.unwrap();
        assert!(limiter.is_rate_limited("a").await.unwrap());
        assert!(!limiter.is_rate_limited("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_check_does_not_create_buckets() {
        let (limiter, _clock) = limiter(RateLimitConfig::default());
        assert!(!limiter.is_rate_limited("ghost").await.unwrap());
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_disabled_always_allows() {
        let (limiter, _clock) = limiter(RateLimitConfig::disabled().with_lockout(1, 300));
        for _ in 0..20 {
            limiter.record_attempt("k", false).await.unwrap();
        }
        assert!(!limiter.is_rate_limited("k").await.unwrap());
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_reset_clears_lockout() {
        let (limiter, _clock) = limiter(RateLimitConfig::default().with_lockout(1, 300));
        limiter.record_attempt("k", false).await.unwrap();
        assert!(limiter.is_rate_limited("k").await.unwrap());
        limiter.reset("k");
        assert!(!limiter.is_rate_limited("k").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_are_all_counted() {
        let limiter = InMemoryRateLimiter::new(RateLimitConfig::default().with_max_attempts(1000, 60));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    limiter.record_attempt("shared", false).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let snapshot = limiter.snapshot("shared").unwrap();
        assert_eq!(snapshot.attempts_in_window, 200);
        assert_eq!(snapshot.consecutive_failures, 200);
    }

    #[test]
    fn test_config_validation() {
        assert!(RateLimitConfig::default().validate().is_ok());
        assert!(RateLimitConfig::default().with_max_attempts(0, 60).validate().is_err());
        assert!(RateLimitConfig::disabled().with_max_attempts(0, 0).validate().is_ok());
        assert!(RateLimitConfig::default().with_lockout(3, 0).validate().is_err());
    }
}
