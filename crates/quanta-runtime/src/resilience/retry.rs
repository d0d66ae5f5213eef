//! Exponential backoff with jitter around fallible async operations.
//!
//! Scheduling comes from [`backon::ExponentialBuilder`]; jitter is applied
//! in the sleeper so every realized wait stays within `[delay / 2, delay]`.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder, Retryable as _};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::providers::ProviderError;

/// Errors that know whether trying again can help.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        self.is_rate_limit()
    }
}

/// Backoff parameters for [`RetryPolicy::execute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Wait before the first retry
    #[serde(with = "crate::config::humantime_serde")]
    pub initial_delay: Duration,

    /// Upper bound for any single wait
    #[serde(with = "crate::config::humantime_serde")]
    pub max_delay: Duration,

    /// Growth factor between consecutive waits
    pub backoff_multiplier: f64,

    /// Randomize each wait into `[delay / 2, delay]`
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 6,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_delay.is_zero() {
            return Err(ConfigError::Invalid(
                "retry.initial_delay must be positive".into(),
            ));
        }
        if self.max_delay < self.initial_delay {
            return Err(ConfigError::Invalid(
                "retry.max_delay must not be below retry.initial_delay".into(),
            ));
        }
        if self.backoff_multiplier <= 1.0 || !self.backoff_multiplier.is_finite() {
            return Err(ConfigError::Invalid(
                "retry.backoff_multiplier must be greater than 1".into(),
            ));
        }
        Ok(())
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.backoff_multiplier as f32)
            .with_max_times(self.max_retries as usize)
    }

    /// Nominal waits before each retry, jitter not applied.
    pub fn schedule(&self) -> Vec<Duration> {
        self.backoff().build().collect()
    }

    /// Longest time a call can spend sleeping between attempts.
    pub fn timeout_ceiling(&self) -> Duration {
        self.max_delay.saturating_mul(self.max_retries)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retries are used up. The last error is returned in the latter cases.
    pub async fn execute<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let jitter = self.jitter;
        let mut retries_left = self.max_retries;

        op.retry(self.backoff())
            .sleep(move |delay: Duration| tokio::time::sleep(realized_delay(delay, jitter)))
            .when(|err: &E| err.is_retryable())
            .notify(move |err: &E, delay: Duration| {
                retries_left = retries_left.saturating_sub(1);
                tracing::warn!(
                    operation = label,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    retries_left,
                    "retryable failure, backing off"
                );
            })
            .await
    }
}

/// Wait actually slept for a nominal `delay`.
pub fn realized_delay(delay: Duration, jitter: bool) -> Duration {
    if !jitter {
        return delay;
    }
    let factor: f64 = rand::thread_rng().gen_range(0.5..=1.0);
    delay.mul_f64(factor).clamp(delay / 2, delay)
}
