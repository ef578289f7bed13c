// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Failed-login throttling, keyed by the normalized login identifier.

use crate::metrics::THROTTLE_LOCKOUT;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default number of failed attempts before lockout
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default lockout duration (5 minutes)
const DEFAULT_LOCKOUT_SECS: u64 = 5 * 60;

/// Failure history is forgotten after a day without new failures
const ENTRY_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Throttle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleSettings {
    /// Failures before lockout; `0` disables throttling
    pub max_attempts: u32,
    /// Lockout length in seconds
    pub lockout_secs: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lockout_secs: DEFAULT_LOCKOUT_SECS,
        }
    }
}

/// Entry in the rate limit map
#[derive(Debug, Clone)]
struct RateLimitEntry {
    failed_attempts: u32,
    last_failure: Instant,
    /// Set while the identifier is locked out
    lockout_expiry: Option<Instant>,
}

/// Rate limiter for login attempts
#[derive(Debug, Clone)]
pub struct AuthRateLimiter {
    attempts: Arc<DashMap<String, RateLimitEntry>>,
    max_attempts: u32,
    lockout_duration: Duration,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::from_settings(&ThrottleSettings::default())
    }
}

impl AuthRateLimiter {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            lockout_duration,
        }
    }

    pub fn from_settings(settings: &ThrottleSettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_secs(settings.lockout_secs),
        )
    }

    fn enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// Record a failed login for `identifier` (already normalized)
    pub fn record_failed_attempt(&self, identifier: &str) {
        if !self.enabled() {
            return;
        }
        let now = Instant::now();

        let mut entry = self
            .attempts
            .entry(identifier.to_string())
            .or_insert_with(|| RateLimitEntry {
                failed_attempts: 0,
                last_failure: now,
                lockout_expiry: None,
            });

        // An expired lockout starts a fresh count
        if entry.lockout_expiry.is_some_and(|expiry| now >= expiry) {
            entry.failed_attempts = 0;
            entry.lockout_expiry = None;
        }

        entry.failed_attempts += 1;
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_attempts && entry.lockout_expiry.is_none() {
            entry.lockout_expiry = Some(now + self.lockout_duration);
            metrics::counter!(THROTTLE_LOCKOUT).increment(1);
            tracing::warn!(
                attempts = entry.failed_attempts,
                lockout_secs = self.lockout_duration.as_secs(),
                "login identifier locked out"
            );
        }
    }

    /// Forget the failure history after a successful login
    pub fn record_success(&self, identifier: &str) {
        self.attempts.remove(identifier);
    }

    /// Is `identifier` allowed to attempt a login right now?
    pub fn check_rate_limit(&self, identifier: &str) -> bool {
        if !self.enabled() {
            return true;
        }
        match self.attempts.get(identifier) {
            Some(entry) => !entry
                .lockout_expiry
                .is_some_and(|expiry| Instant::now() < expiry),
            None => true,
        }
    }

    /// Drop expired lockouts and stale failure counts
    pub fn cleanup(&self) {
        let now = Instant::now();

        self.attempts.retain(|_, entry| {
            if let Some(expiry) = entry.lockout_expiry {
                return now < expiry;
            }
            now.duration_since(entry.last_failure) < ENTRY_RETENTION
        });
    }

    /// Number of identifiers with a failure history
    pub fn tracked(&self) -> usize {
        self.attempts.len()
    }
}
