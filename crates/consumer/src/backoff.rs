//! Exponential backoff for transient fetch and reconnect errors.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry delay shaping for transient errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first retry
    pub initial: Duration,
    /// Upper bound for the delay between retries
    pub max: Duration,
    /// Multiplier applied to the delay after each retry
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Mutable backoff state for one retry sequence.
///
/// `next_delay` returns the delay to sleep before the next attempt and
/// advances the state. Call `reset` after a successful operation.
#[derive(Debug)]
pub struct Backoff {
    config: RetryConfig,
    current: Duration,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        let current = config.initial;
        Self { config, current }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .mul_f64(self.config.multiplier)
            .min(self.config.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.config.initial;
    }
}
