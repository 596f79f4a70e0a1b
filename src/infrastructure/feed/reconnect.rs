//! Reconnection Policy
//!
//! Computes the delay before each reconnection attempt. The default is a
//! fixed 5 second delay with unlimited attempts, favoring availability
//! over backpressure for a long-lived market feed. Exponential backoff
//! with jitter is available through configuration.

use std::time::Duration;

use rand::Rng;

use crate::infrastructure::config::WebSocketSettings;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the computed delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each attempt. `1.0` keeps
    /// the delay fixed.
    pub multiplier: f64,
    /// Random jitter factor in `[0.0, 1.0]` applied to each delay.
    pub jitter_factor: f64,
    /// Maximum number of attempts before giving up. `0` means unlimited.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(5),
            multiplier: 1.0,
            jitter_factor: 0.0,
            max_attempts: 0,
        }
    }
}

impl ReconnectConfig {
    /// Create configuration from [`WebSocketSettings`].
    #[must_use]
    pub const fn from_websocket_settings(settings: &WebSocketSettings) -> Self {
        Self {
            initial_delay: settings.reconnect_delay_initial,
            max_delay: settings.reconnect_delay_max,
            multiplier: settings.reconnect_delay_multiplier,
            jitter_factor: settings.reconnect_jitter_factor,
            max_attempts: settings.max_reconnect_attempts,
        }
    }
}

/// Stateful reconnection policy tracking consecutive failed attempts.
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempt: u32,
    current_delay: Duration,
}

impl ReconnectPolicy {
    /// Create a new policy from configuration.
    ///
    /// Multiplier and jitter are clamped to sane ranges (multiplier at
    /// least 1.0, jitter within `[0.0, 1.0]`) so a misconfigured value
    /// can never produce a negative delay.
    #[must_use]
    pub fn new(mut config: ReconnectConfig) -> Self {
        config.multiplier = if config.multiplier.is_finite() {
            config.multiplier.max(1.0)
        } else {
            1.0
        };
        config.jitter_factor = if config.jitter_factor.is_finite() {
            config.jitter_factor.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let current_delay = config.initial_delay;
        Self {
            config,
            attempt: 0,
            current_delay,
        }
    }

    /// Number of consecutive failed attempts recorded so far.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt
    }

    /// Delay the next wait would use, without recording an attempt.
    #[must_use]
    pub const fn current_delay(&self) -> Duration {
        self.current_delay
    }

    /// Whether another attempt is permitted.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        self.config.max_attempts == 0 || self.attempt < self.config.max_attempts
    }

    /// Record a failed attempt and return the delay to wait before the
    /// next one.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);

        let delay = self.apply_jitter(self.current_delay);

        let next = self.current_delay.as_secs_f64() * self.config.multiplier;
        self.current_delay = Duration::from_secs_f64(next).min(self.config.max_delay);

        delay
    }

    /// Reset after a connection is successfully established.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.current_delay = self.config.initial_delay;
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return delay;
        }
        let jitter_range = delay.as_secs_f64() * self.config.jitter_factor;
        let jitter = rand::rng().random_range(-jitter_range..=jitter_range);
        Duration::from_secs_f64((delay.as_secs_f64() + jitter).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_fixed_five_second_delay() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());

        for _ in 0..10 {
            assert!(policy.should_retry());
            assert_eq!(policy.next_delay(), Duration::from_secs(5));
        }
        assert_eq!(policy.attempt_count(), 10);
    }

    #[test]
    fn unlimited_attempts_never_give_up() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());

        for _ in 0..1_000 {
            policy.next_delay();
        }
        assert!(policy.should_retry());
    }

    #[test]
    fn exponential_backoff_doubles_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter_factor: 0.0,
            max_attempts: 0,
        };
        let mut policy = ReconnectPolicy::new(config);

        assert_eq!(policy.next_delay(), Duration::from_secs(1));
        assert_eq!(policy.next_delay(), Duration::from_secs(2));
        assert_eq!(policy.next_delay(), Duration::from_secs(4));
        assert_eq!(policy.next_delay(), Duration::from_secs(8));
    }

    #[test]
    fn delay_is_capped_at_max() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(15),
            multiplier: 3.0,
            jitter_factor: 0.0,
            max_attempts: 0,
        };
        let mut policy = ReconnectPolicy::new(config);

        assert_eq!(policy.next_delay(), Duration::from_secs(10));
        assert_eq!(policy.next_delay(), Duration::from_secs(15));
        assert_eq!(policy.next_delay(), Duration::from_secs(15));
    }

    #[test]
    fn max_attempts_limits_retries() {
        let config = ReconnectConfig {
            max_attempts: 3,
            ..ReconnectConfig::default()
        };
        let mut policy = ReconnectPolicy::new(config);

        assert!(policy.should_retry());
        policy.next_delay();
        policy.next_delay();
        assert!(policy.should_retry());
        policy.next_delay();
        assert!(!policy.should_retry());
    }

    #[test]
    fn reset_restores_initial_state() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter_factor: 0.0,
            max_attempts: 5,
        };
        let mut policy = ReconnectPolicy::new(config);

        policy.next_delay();
        policy.next_delay();
        policy.next_delay();
        assert_eq!(policy.attempt_count(), 3);

        policy.reset();
        assert_eq!(policy.attempt_count(), 0);
        assert_eq!(policy.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn hostile_multiplier_cannot_panic_the_policy() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(5),
            multiplier: -3.0,
            jitter_factor: -2.0,
            max_attempts: 0,
        };
        let mut policy = ReconnectPolicy::new(config);

        // Clamped to a fixed delay; no negative durations.
        for _ in 0..5 {
            assert_eq!(policy.next_delay(), Duration::from_secs(5));
        }
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(10),
            multiplier: 1.0,
            jitter_factor: 0.25,
            max_attempts: 0,
        };
        let mut policy = ReconnectPolicy::new(config);

        for _ in 0..100 {
            let delay = policy.next_delay();
            assert!(delay >= Duration::from_secs_f64(7.5));
            assert!(delay <= Duration::from_secs_f64(12.5));
        }
    }
}
