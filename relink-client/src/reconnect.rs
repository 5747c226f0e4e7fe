//! Reconnection timing for the supervisor.

use relink_core::ConfigError;
use std::time::Duration;

/// Configuration for reconnection behavior.
///
/// With the default multiplier of `1.0` every failed attempt waits exactly
/// `retry_interval`; larger multipliers grow the delay geometrically up to
/// `max_delay`.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay after a failed connect attempt.
    pub retry_interval: Duration,
    /// Delay between supervisor cycles while connected.
    pub health_interval: Duration,
    /// Multiplier applied to the delay after each consecutive failure.
    pub backoff_multiplier: f64,
    /// Upper bound on the failure delay.
    pub max_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(3000),
            health_interval: Duration::from_millis(1000),
            backoff_multiplier: 1.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectConfig {
    /// Checks that the timings are usable.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidSetting`] for zero intervals, a
    /// multiplier below `1.0` or a `max_delay` shorter than `retry_interval`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_interval.is_zero() {
            return Err(ConfigError::invalid_setting("retry_interval", "must be > 0"));
        }
        if self.health_interval.is_zero() {
            return Err(ConfigError::invalid_setting("health_interval", "must be > 0"));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::invalid_setting(
                "backoff_multiplier",
                "must be a finite value >= 1.0",
            ));
        }
        if self.max_delay < self.retry_interval {
            return Err(ConfigError::invalid_setting(
                "max_delay",
                "must be >= retry_interval",
            ));
        }
        Ok(())
    }
}

/// Tracks consecutive connect failures and calculates delays.
#[derive(Debug)]
pub struct ReconnectState {
    config: ReconnectConfig,
    attempts: usize,
    current_delay: Duration,
}

impl ReconnectState {
    /// Creates a new reconnect state with the given configuration.
    #[must_use]
    pub fn new(config: ReconnectConfig) -> Self {
        let retry_interval = config.retry_interval;
        Self {
            config,
            attempts: 0,
            current_delay: retry_interval,
        }
    }

    /// Records a failed connection attempt and returns the delay before the
    /// next one. Retries are unlimited.
    pub fn on_failure(&mut self) -> Duration {
        self.attempts += 1;

        let delay = self.current_delay;

        let next_delay = Duration::from_secs_f64(
            self.current_delay.as_secs_f64() * self.config.backoff_multiplier,
        );
        self.current_delay = next_delay.min(self.config.max_delay);

        delay
    }

    /// Resets the state after a successful connection.
    pub fn on_success(&mut self) {
        self.attempts = 0;
        self.current_delay = self.config.retry_interval;
    }

    /// Returns the number of consecutive failed attempts.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Returns the delay to wait while connected.
    #[must_use]
    pub fn health_interval(&self) -> Duration {
        self.config.health_interval
    }
}
