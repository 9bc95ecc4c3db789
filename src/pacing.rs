//! Send pacing — randomized inter-send delays.
//!
//! A fixed interval between sends is exactly the pattern destination-side
//! abuse detection looks for, so each delay is drawn uniformly from a
//! configured range instead.

use std::time::Duration;

use rand::Rng;

use crate::error::ConfigError;

/// Enforces a randomized delay between consecutive sends. The caller skips
/// the wait before the very first send of a run.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_delay: Duration,
    max_delay: Duration,
}

impl RateLimiter {
    /// Bounds are validated here so a bad configuration fails at startup,
    /// never mid-run.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Result<Self, ConfigError> {
        if min_delay > max_delay {
            return Err(ConfigError::InvalidValue {
                key: "SEND_MIN_DELAY_MS".into(),
                message: format!(
                    "min delay {}ms exceeds max delay {}ms",
                    min_delay.as_millis(),
                    max_delay.as_millis()
                ),
            });
        }
        Ok(Self {
            min_delay,
            max_delay,
        })
    }

    pub fn bounds(&self) -> (Duration, Duration) {
        (self.min_delay, self.max_delay)
    }

    /// One delay drawn uniformly from `[min_delay, max_delay]`.
    pub fn sample_delay(&self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        let ms = rand::thread_rng().gen_range(min..=max);
        Duration::from_millis(ms)
    }

    /// Sleep for one sampled delay.
    pub async fn wait_before_next_send(&self) {
        tokio::time::sleep(self.sample_delay()).await;
    }
}
