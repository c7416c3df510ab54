//! Retry policy with exponential backoff.
//!
//! Only transient provider errors are retried: timeouts and rate limits.
//! The policy decides *whether* and *when* to try again; the caller owns
//! the attempt itself, so every attempt takes and resolves its own breaker
//! permit.

use counsel_core::{ConfigError, ProviderError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per agent call, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Longest delay the policy will wait; a longer `Retry-After` ends retrying
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        if !(self.multiplier.is_finite() && self.multiplier >= 1.0) {
            return Err(ConfigError::invalid("retry.multiplier", "must be at least 1.0"));
        }
        if self.initial_delay > self.max_delay {
            return Err(ConfigError::invalid(
                "retry.initial_delay",
                "must not exceed retry.max_delay",
            ));
        }
        Ok(())
    }
}

/// Retry policy for provider calls
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(config: RetryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Policy that makes a single attempt
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            config: RetryConfig::disabled(),
        }
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Whether the error is transient
    #[must_use]
    pub fn is_retryable(&self, error: &ProviderError) -> bool {
        matches!(
            error,
            ProviderError::Timeout { .. } | ProviderError::RateLimited { .. }
        )
    }

    /// Backoff before retry number `retry` (0-indexed), capped at `max_delay`
    #[must_use]
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let factor = self.config.multiplier.powi(i32::try_from(retry).unwrap_or(i32::MAX));
        let millis = self.config.initial_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.config.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Wait before the next attempt, or `None` when `error` is final.
    ///
    /// `attempts_made` counts attempts already finished, so the first call
    /// after one failure passes 1. A `Retry-After` longer than the backoff
    /// wins; one longer than `max_delay` stops retrying.
    #[must_use]
    pub fn next_delay(&self, error: &ProviderError, attempts_made: u32) -> Option<Duration> {
        if attempts_made >= self.config.max_attempts || !self.is_retryable(error) {
            return None;
        }
        let backoff = self.delay_for_attempt(attempts_made.saturating_sub(1));
        let delay = match error {
            ProviderError::RateLimited {
                retry_after_secs: Some(secs),
            } => backoff.max(Duration::from_secs(*secs)),
            _ => backoff,
        };
        (delay <= self.config.max_delay).then_some(delay)
    }
}
