//! Polite random delay applied before every request.

use rand::Rng;
use tokio::time::Duration;

use crate::config::ScraperConfig;

/// Delay policy: sleep a random duration in `[min_delay, max_delay]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiter {
    min_delay: Duration,
    max_delay: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `min_delay_secs` - Minimum delay before a request
    /// * `max_delay_secs` - Maximum delay before a request
    pub fn new(min_delay_secs: f64, max_delay_secs: f64) -> Self {
        let min = min_delay_secs.max(0.0);
        let max = max_delay_secs.max(min);

        Self {
            min_delay: Duration::from_secs_f64(min),
            max_delay: Duration::from_secs_f64(max),
        }
    }

    /// The fixed policy used against the source site (2-3s)
    pub fn polite() -> Self {
        Self::new(2.0, 3.0)
    }

    /// No delay at all
    pub fn disabled() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.min_delay_secs, config.max_delay_secs)
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Pick the next delay
    pub fn next_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let range = self.max_delay - self.min_delay;
        self.min_delay + range.mul_f64(rand::thread_rng().gen_range(0.0..=1.0))
    }

    /// Wait before issuing a request
    pub async fn acquire(&self) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }
        tracing::trace!("Waiting {:?} before request", delay);
        tokio::time::sleep(delay).await;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::polite()
    }
}
