// ABOUTME: Fixed-window rate limiting keyed by client identity with lazy stale cleanup
// ABOUTME: Independent limiter instances guard token issuance and token validation budgets
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Fixed-Window Rate Limiting
//!
//! Per-client fixed-window counters over a sharded concurrent map
//! (`DashMap`) for fine-grained locking instead of a global mutex. Fixed
//! windows are intentionally simple: a burst straddling a window boundary
//! can momentarily admit close to twice the configured maximum. That is an
//! accepted trade-off of the algorithm, not a bug.
//!
//! Two independent instances are used in this service, one for issuance and
//! one for validation, so a validation attack cannot starve legitimate
//! issuance or vice versa.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Configuration for one fixed-window limiter instance
#[derive(Debug, Clone, Copy)]
pub struct FixedWindowConfig {
    /// Maximum requests admitted per key per window
    pub max_requests: u32,
    /// Window length
    pub window: Duration,
    /// Map size past which stale-entry cleanup runs
    pub cleanup_threshold: usize,
    /// Age after which an idle counter is evictable
    pub stale_after: Duration,
}

impl FixedWindowConfig {
    /// Limiter admitting `max_requests` per `window` per key
    #[must_use]
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            cleanup_threshold: 10_000,
            stale_after: Duration::from_secs(600),
        }
    }
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy)]
pub struct RateLimitStatus {
    /// Whether this request exceeded the budget (and was not counted)
    pub is_limited: bool,
    /// Configured per-window maximum
    pub limit: u32,
    /// Requests remaining in the current window after this one
    pub remaining: u32,
    /// Seconds until the window resets; meaningful when limited
    pub retry_after_secs: u64,
}

/// Per-key request tracking: key -> (`request_count`, `window_start`)
#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    count: u32,
    window_start: Instant,
}

/// Fixed-window rate limiter keyed by client identity
pub struct FixedWindowRateLimiter {
    state: DashMap<String, WindowCounter>,
    config: FixedWindowConfig,
}

impl FixedWindowRateLimiter {
    /// Create a limiter with the given configuration
    #[must_use]
    pub fn new(config: FixedWindowConfig) -> Self {
        Self {
            state: DashMap::new(),
            config,
        }
    }

    /// Check and consume one unit of budget for `key`.
    ///
    /// First sight of a key starts a window with count 1. A check past the
    /// window start + length resets the window. At the maximum the request
    /// is refused and NOT counted, so a rejected burst cannot extend its
    /// own lockout.
    pub fn check(&self, key: &str) -> RateLimitStatus {
        self.check_at(key, Instant::now())
    }

    pub(crate) fn check_at(&self, key: &str, now: Instant) -> RateLimitStatus {
        let limit = self.config.max_requests;

        // DashMap entry API keeps the read-modify-write atomic per key
        let mut entry = self
            .state
            .entry(key.to_owned())
            .or_insert(WindowCounter {
                count: 0,
                window_start: now,
            });
        let counter = entry.value_mut();

        if now.duration_since(counter.window_start) >= self.config.window {
            counter.count = 0;
            counter.window_start = now;
        }

        let is_limited = counter.count >= limit;
        if !is_limited {
            counter.count += 1;
        }

        let remaining = limit.saturating_sub(counter.count);
        let elapsed = now.duration_since(counter.window_start);
        drop(entry);

        // Lazy cleanup off the critical path: only when the map has grown
        if self.state.len() > self.config.cleanup_threshold {
            self.purge_stale_at(now);
        }

        let retry_after_secs = self.config.window.saturating_sub(elapsed).as_secs().max(1);

        RateLimitStatus {
            is_limited,
            limit,
            remaining,
            retry_after_secs,
        }
    }

    /// Convenience wrapper: true when the request is admitted
    pub fn allow(&self, key: &str) -> bool {
        !self.check(key).is_limited
    }

    /// Evict counters idle past the configured stale age.
    ///
    /// Also invoked by the background maintenance task so an attacker
    /// cycling many distinct client identities cannot grow the map
    /// unboundedly.
    pub fn purge_stale(&self) {
        self.purge_stale_at(Instant::now());
    }

    pub(crate) fn purge_stale_at(&self, now: Instant) {
        self.state.retain(|_key, counter| {
            now.duration_since(counter.window_start) < self.config.stale_after
        });
    }

    /// Number of tracked client identities
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.state.len()
    }
}
