//! Jittered request pacing
//!
//! Each wait lasts `base + uniform(0, jitter)`. The random part hides the
//! periodic timing signature of a fixed interval; `base + jitter` bounds the
//! worst-case request rate.

use std::time::Duration;

/// Polite delay generator for one class of requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    base: Duration,
    jitter: Duration,
}

impl RateLimiter {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    /// Builds a limiter from seconds; negative or non-finite values count as zero
    pub fn from_secs(base_secs: f64, jitter_secs: f64) -> Self {
        Self::new(secs_to_duration(base_secs), secs_to_duration(jitter_secs))
    }

    /// A limiter that never waits
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    /// Upper bound of any single delay
    pub fn max_delay(&self) -> Duration {
        self.base + self.jitter
    }

    /// Draws the next delay from `[base, base + jitter)`
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.base;
        }
        self.base + self.jitter.mul_f64(fastrand::f64())
    }

    /// Sleeps for the next delay and returns how long it was
    pub async fn wait(&self) -> Duration {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        delay
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}
