// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter for signup and login attempts.
//!
//! Each key (normally the caller address) owns an ordered queue of attempt
//! instants. A check prunes instants older than the window, denies when the
//! queue is full, and otherwise records the attempt. The prune, check and
//! append happen under one lock, so two concurrent callers can never both
//! take the last free slot.

use crate::config::RateLimitConfig;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Attempts left in the current window
        remaining: u32,
    },
    /// Request is rate limited
    Limited {
        /// Time until the oldest recorded attempt leaves the window
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Gate consulted before any admission work is done.
///
/// Implementations must make the check-and-record step atomic per key.
#[async_trait]
pub trait AdmissionGate: Send + Sync {
    async fn admit(&self, key: &str) -> RateLimitResult;
}

/// In-process sliding-window limiter. State is lost on restart.
pub struct SlidingWindowLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Check and record one attempt for `key`.
    pub async fn check(&self, key: &str) -> RateLimitResult {
        let now = Instant::now();
        let window = self.config.window_duration();
        let max = self.config.max_attempts as usize;

        let mut windows = self.windows.lock().await;
        let attempts = windows.entry(key.to_string()).or_default();
        prune(attempts, now, window);

        if attempts.len() >= max {
            let retry_after = attempts
                .front()
                .map(|oldest| (*oldest + window).saturating_duration_since(now))
                .unwrap_or(window);
            debug!(key, ?retry_after, "Attempt limit reached");
            return RateLimitResult::Limited { retry_after };
        }

        attempts.push_back(now);
        RateLimitResult::Allowed {
            remaining: (max - attempts.len()) as u32,
        }
    }

    /// Drop windows with no attempts left inside them.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let window = self.config.window_duration();

        let mut windows = self.windows.lock().await;
        windows.retain(|_, attempts| {
            prune(attempts, now, window);
            !attempts.is_empty()
        });
    }

    /// Number of keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[async_trait]
impl AdmissionGate for SlidingWindowLimiter {
    async fn admit(&self, key: &str) -> RateLimitResult {
        self.check(key).await
    }
}

fn prune(attempts: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = attempts.front() {
        if now.duration_since(*oldest) >= window {
            attempts.pop_front();
        } else {
            break;
        }
    }
}
