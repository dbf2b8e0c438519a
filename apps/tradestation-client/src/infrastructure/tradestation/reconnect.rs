//! Stream reconnection backoff.
//!
//! Exponential delay with jitter, capped at a maximum. Attempts are
//! unbounded: a stream only ends when its consumer goes away or is cancelled.

use std::time::Duration;

use rand::Rng;

use super::config::StreamSettings;

/// Backoff parameters.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first reconnect.
    pub initial_delay: Duration,
    /// Upper bound on any delay (before jitter).
    pub max_delay: Duration,
    /// Growth factor per attempt.
    pub multiplier: f64,
    /// Jitter as a fraction of the delay (0.1 = ±10%).
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::from(&StreamSettings::default())
    }
}

impl From<&StreamSettings> for BackoffConfig {
    fn from(settings: &StreamSettings) -> Self {
        Self {
            initial_delay: settings.reconnect_delay_initial,
            max_delay: settings.reconnect_delay_max,
            multiplier: settings.reconnect_delay_multiplier,
            jitter_factor: 0.1,
        }
    }
}

/// Per-stream backoff state.
#[derive(Debug)]
pub struct ReconnectBackoff {
    config: BackoffConfig,
    current_delay: Duration,
    attempts: u32,
}

impl ReconnectBackoff {
    /// Start at the initial delay.
    #[must_use]
    pub const fn new(config: BackoffConfig) -> Self {
        let current_delay = config.initial_delay;
        Self {
            config,
            current_delay,
            attempts: 0,
        }
    }

    /// Delay before the next reconnect; grows the following one.
    pub fn next_delay(&mut self) -> Duration {
        self.attempts = self.attempts.saturating_add(1);
        let delay = self.jittered(self.current_delay);

        let max_millis = u64::try_from(self.config.max_delay.as_millis()).unwrap_or(u64::MAX);
        let scaled = (self.current_delay.as_millis() as f64 * self.config.multiplier).round();
        let next_millis = if scaled.is_finite() {
            (scaled.max(0.0) as u64).min(max_millis)
        } else {
            max_millis
        };
        self.current_delay = Duration::from_millis(next_millis);

        delay
    }

    /// Return to the initial delay once a connection has delivered data.
    pub const fn reset(&mut self) {
        self.current_delay = self.config.initial_delay;
        self.attempts = 0;
    }

    /// Consecutive reconnects since the last reset.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 || delay.is_zero() {
            return delay;
        }
        let base = delay.as_millis() as f64;
        let range = base * self.config.jitter_factor;
        let jitter: f64 = rand::rng().random_range(-range..=range);
        Duration::from_millis((base + jitter).max(1.0) as u64)
    }
}
