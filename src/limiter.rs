// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter keyed by caller identity.
//!
//! Each identifier keeps the instants of its admitted requests inside the
//! trailing window. A check drops expired instants, then either records the
//! current instant or rejects without recording. The check and the record
//! happen under the identifier's map entry lock, so concurrent callers for
//! the same identifier cannot both take the last free slot.

use crate::config::RateLimitConfig;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining requests in current window
        remaining: u32,
    },
    /// Request is rate limited
    Limited {
        /// Time until the oldest recorded request leaves the window
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Thread-safe sliding-window rate limiter.
pub struct RateLimiter {
    /// Configuration
    config: RateLimitConfig,
    /// Admitted request instants per identifier, oldest first
    windows: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check and, if admitted, record a request for `identifier`.
    pub fn check(&self, identifier: &str) -> RateLimitResult {
        let now = Instant::now();
        let window = self.config.window_duration();
        let max = self.config.max_requests as usize;

        let mut entry = self.windows.entry(identifier.to_string()).or_default();
        let times = entry.value_mut();

        while let Some(oldest) = times.front() {
            if now.duration_since(*oldest) >= window {
                times.pop_front();
            } else {
                break;
            }
        }

        if times.len() >= max {
            let retry_after = times
                .front()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            debug!(identifier, ?retry_after, "Rate limit exceeded");
            return RateLimitResult::Limited { retry_after };
        }

        times.push_back(now);
        RateLimitResult::Allowed {
            remaining: (max - times.len()) as u32,
        }
    }

    /// Evict identifiers whose latest request is older than twice the window.
    ///
    /// Keys are snapshotted first and each eviction re-checks its entry, so
    /// admission checks on other identifiers are never blocked by the sweep.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let stale_after = self.config.window_duration() * 2;

        let keys: Vec<String> = self.windows.iter().map(|e| e.key().clone()).collect();
        let mut evicted = 0;
        for key in keys {
            let removed = self.windows.remove_if(&key, |_, times| {
                times
                    .back()
                    .map_or(true, |latest| now.duration_since(*latest) > stale_after)
            });
            if removed.is_some() {
                evicted += 1;
            }
        }

        if evicted > 0 {
            info!(evicted, remaining = self.windows.len(), "Rate limiter cleanup");
        }
        evicted
    }

    /// Number of identifiers currently tracked.
    pub fn tracked_identifiers(&self) -> usize {
        self.windows.len()
    }
}
