//! Retry utilities with configurable backoff and jitter.
//!
//! [`with_retry`] wraps a function so every call is timeout-guarded and
//! retried on transient failures, stopping early on [`NonRetryableError`].

use crate::cancellation::{delay, run_timeout, CancellationSignal};
use crate::errors::{AbortReason, AsyncError, NonRetryableError, UsageError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryType {
    /// delay = base * attempt
    Linear,
    /// delay = base * 2^(attempt - 1)
    #[default]
    Exponential,
}

impl FromStr for RetryType {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            other => Err(UsageError::InvalidRetryConfig(format!(
                "unknown retry type {other:?}"
            ))),
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Base for the backoff computation, in milliseconds.
    pub backoff_base_ms: u64,
    /// Total number of attempts, including the first.
    pub retries: u32,
    /// Per-attempt timeout in milliseconds. `None` means unbounded.
    pub timeout_operation_ms: Option<u64>,
    /// Jitter is drawn uniformly from `[-jitter_factor, jitter_factor]` ms.
    pub jitter_factor: f64,
    /// Backoff strategy.
    pub retry_type: RetryType,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: 100,
            retries: 3,
            timeout_operation_ms: None,
            jitter_factor: 1.0,
            retry_type: RetryType::Exponential,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backoff base.
    #[must_use]
    pub fn with_backoff_base_ms(mut self, base: u64) -> Self {
        self.backoff_base_ms = base;
        self
    }

    /// Sets the total number of attempts.
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout: u64) -> Self {
        self.timeout_operation_ms = Some(timeout);
        self
    }

    /// Sets the jitter factor.
    #[must_use]
    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_retry_type(mut self, retry_type: RetryType) -> Self {
        self.retry_type = retry_type;
        self
    }

    /// Checks the configuration for values the engine cannot honor.
    pub fn validate(&self) -> Result<(), UsageError> {
        if self.retries == 0 {
            return Err(UsageError::InvalidRetryConfig(
                "retries must be at least 1".to_string(),
            ));
        }
        if self.backoff_base_ms == 0 {
            return Err(UsageError::InvalidRetryConfig(
                "backoff_base_ms must be greater than zero".to_string(),
            ));
        }
        if !self.jitter_factor.is_finite() || self.jitter_factor < 0.0 {
            return Err(UsageError::InvalidRetryConfig(format!(
                "jitter_factor must be a non-negative number, got {}",
                self.jitter_factor
            )));
        }
        if self.timeout_operation_ms == Some(0) {
            return Err(UsageError::InvalidRetryConfig(
                "timeout_operation_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the per-attempt timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_operation_ms.map(Duration::from_millis)
    }

    /// Backoff before jitter for the given 1-based attempt, in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn baseline_ms(&self, attempt: u32) -> f64 {
        let base = self.backoff_base_ms as f64;
        match self.retry_type {
            RetryType::Exponential => {
                base * 2f64.powi(i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX))
            }
            RetryType::Linear => base * f64::from(attempt),
        }
    }

    /// Calculates the sleep after the given 1-based attempt failed.
    ///
    /// Jitter is added to the baseline and the result is floored at 1ms.
    #[must_use]
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_factor.is_finite() && self.jitter_factor > 0.0 {
            rand::thread_rng().gen_range(-self.jitter_factor..=self.jitter_factor)
        } else {
            0.0
        };
        let ms = (self.baseline_ms(attempt) + jitter).max(1.0);
        Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX)
    }
}

/// How the retry engine treats a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// May succeed on another attempt.
    Transient,
    /// Explicitly marked as not worth retrying.
    NonRetryable,
    /// A programming defect rather than a fault; never retried.
    Fatal,
}

/// Classifies errors for the retry engine.
pub trait RetryClassify {
    /// Returns how the retry engine should treat this error.
    fn retry_class(&self) -> RetryClass;
}

impl RetryClassify for AsyncError {
    fn retry_class(&self) -> RetryClass {
        match self {
            Self::StopRetry(_) => RetryClass::NonRetryable,
            Self::Usage(_) => RetryClass::Fatal,
            Self::Aborted(_) => RetryClass::Transient,
            Self::Operation(err) => err.retry_class(),
        }
    }
}

impl RetryClassify for anyhow::Error {
    fn retry_class(&self) -> RetryClass {
        if self.downcast_ref::<NonRetryableError>().is_some() {
            RetryClass::NonRetryable
        } else if self.downcast_ref::<UsageError>().is_some() {
            RetryClass::Fatal
        } else {
            match self.downcast_ref::<AsyncError>() {
                Some(inner) => inner.retry_class(),
                None => RetryClass::Transient,
            }
        }
    }
}

impl RetryClassify for NonRetryableError {
    fn retry_class(&self) -> RetryClass {
        RetryClass::NonRetryable
    }
}

impl RetryClassify for AbortReason {
    fn retry_class(&self) -> RetryClass {
        RetryClass::Transient
    }
}

impl RetryClassify for std::io::Error {
    fn retry_class(&self) -> RetryClass {
        RetryClass::Transient
    }
}

/// A function wrapped with retry behavior.
///
/// Created by [`with_retry`]. The configuration is fixed at construction.
#[derive(Debug, Clone)]
pub struct Retry<F> {
    operation: F,
    config: RetryConfig,
    signal: Option<CancellationSignal>,
}

/// Wraps `operation` so each [`Retry::call`] is timeout-guarded and retried.
///
/// The config is checked with [`RetryConfig::validate`] up front, so an
/// invalid config fails here instead of on the first call.
///
/// ```rust,ignore
/// let fetch = with_retry(|url: String| async move { client.get(&url).await }, RetryConfig::new().with_timeout_ms(500))?;
/// let body = fetch.call("https://example.com".to_string()).await?;
/// ```
pub fn with_retry<F>(operation: F, config: RetryConfig) -> Result<Retry<F>, UsageError> {
    config.validate()?;
    Ok(Retry {
        operation,
        config,
        signal: None,
    })
}

impl<F> Retry<F> {
    /// Makes backoff sleeps cancellable by `signal`.
    #[must_use]
    pub fn with_signal(mut self, signal: CancellationSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Returns the retry configuration.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Invokes the wrapped function with retries.
    ///
    /// The function may run up to `retries` times with clones of `args`, so it
    /// must tolerate being re-invoked.
    pub async fn call<A, Fut, T, E>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        A: Clone,
        Fut: Future<Output = Result<T, E>>,
        E: RetryClassify + From<AbortReason> + Display,
    {
        let attempts = self.config.retries;
        let timeout = self.config.timeout();
        let mut attempt = 1;

        loop {
            let future = (self.operation)(args.clone());
            let outcome = match timeout {
                Some(duration) => run_timeout(future, duration).await,
                None => Ok(future.await),
            };

            let error = match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(error)) => error,
                Err(reason) => E::from(reason),
            };

            match error.retry_class() {
                RetryClass::Transient => {}
                class => {
                    tracing::debug!(attempt, ?class, error = %error, "Not retrying");
                    return Err(error);
                }
            }

            if attempt >= attempts {
                tracing::debug!(attempt, error = %error, "Retries exhausted");
                return Err(error);
            }

            let backoff = self.config.calculate_delay(attempt);
            tracing::debug!(
                attempt,
                delay_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Retrying after error"
            );
            if let Err(reason) = delay(backoff, self.signal.as_ref()).await {
                return Err(E::from(reason));
            }
            attempt += 1;
        }
    }
}
