//! Pacing for LLM calls
//!
//! Every agent step goes through a shared [`StepThrottle`]: a requests-per-minute
//! quota is awaited before each LLM call, and a fixed pause follows each
//! completed step. One throttle is shared by all agents of a runtime.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared rate limit and inter-step delay
pub struct StepThrottle {
    limiter: Option<DirectRateLimiter>,
    step_delay: Duration,
}

impl StepThrottle {
    /// Create a throttle allowing `max_rpm` LLM calls per minute.
    ///
    /// A `max_rpm` of zero disables the quota.
    pub fn new(max_rpm: u32, step_delay: Duration) -> Self {
        let limiter =
            NonZeroU32::new(max_rpm).map(|rpm| RateLimiter::direct(Quota::per_minute(rpm)));
        Self {
            limiter,
            step_delay,
        }
    }

    /// No quota, no delay
    pub fn unlimited() -> Self {
        Self {
            limiter: None,
            step_delay: Duration::ZERO,
        }
    }

    pub fn step_delay(&self) -> Duration {
        self.step_delay
    }

    pub fn is_rate_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait until the quota admits another LLM call
    pub async fn before_call(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Pause after a finished agent step
    pub async fn after_step(&self) {
        if !self.step_delay.is_zero() {
            debug!(delay_ms = self.step_delay.as_millis() as u64, "Step delay");
            tokio::time::sleep(self.step_delay).await;
        }
    }
}

impl Default for StepThrottle {
    /// 15 calls per minute and a 5 second pause between steps
    fn default() -> Self {
        Self::new(15, Duration::from_secs(5))
    }
}
