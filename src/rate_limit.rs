//! Fixed-window, per-identifier rate limiting for the chat endpoint.
//!
//! One identifier may pass once per window. The check-and-set for a key
//! runs under that key's map entry, so concurrent requests from the same
//! identifier cannot both pass. Entries older than the window are dropped
//! by [`RateLimiter::sweep`], either periodically or when the table grows
//! past its cap.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

/// Table size that triggers an inline sweep.
const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    #[serde(rename = "retryAfterMs", serialize_with = "as_millis")]
    pub retry_after: Duration,
}

impl RateLimitDecision {
    fn allowed() -> Self {
        Self { allowed: true, retry_after: Duration::ZERO }
    }

    fn denied(retry_after: Duration) -> Self {
        Self { allowed: false, retry_after }
    }

    /// `Retry-After` header value: whole seconds, rounded up, at least 1.
    pub fn retry_after_secs(&self) -> u64 {
        let ms = self.retry_after.as_millis() as u64;
        ms.div_ceil(1000).max(1)
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_entries: usize,
    last_allowed: DashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self::with_capacity(window, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(window: Duration, max_entries: usize) -> Self {
        Self {
            window,
            max_entries,
            last_allowed: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, Instant::now())
    }

    pub fn check_at(&self, identifier: &str, now: Instant) -> RateLimitDecision {
        if self.last_allowed.len() >= self.max_entries {
            self.sweep(now);
        }

        match self.last_allowed.entry(identifier.to_string()) {
            Entry::Occupied(mut slot) => {
                let elapsed = now.saturating_duration_since(*slot.get());
                if elapsed < self.window {
                    return RateLimitDecision::denied(self.window - elapsed);
                }
                slot.insert(now);
                RateLimitDecision::allowed()
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                RateLimitDecision::allowed()
            }
        }
    }

    /// Drop identifiers whose window has fully elapsed. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.last_allowed.len();
        self.last_allowed
            .retain(|_, last| now.saturating_duration_since(*last) < self.window);
        before.saturating_sub(self.last_allowed.len())
    }

    pub fn len(&self) -> usize {
        self.last_allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_allowed.is_empty()
    }

    /// Sweep on a fixed period until the returned task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = self.sweep(Instant::now());
                if removed > 0 {
                    tracing::debug!(removed, remaining = self.len(), "rate limiter sweep");
                }
            }
        })
    }
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}
