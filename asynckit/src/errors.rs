//! Error types for asynckit.
//!
//! Failures fall into five groups: cancellation ([`AbortReason`]), timeouts
//! (the [`AbortReason::Timeout`] variant carrying a [`TimeoutError`]),
//! explicit retry stops ([`NonRetryableError`]), opaque operation failures,
//! and usage errors ([`UsageError`]). [`AsyncError`] ties them together for
//! callers that want a single error type.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The main error type for asynckit operations.
#[derive(Debug, Error)]
pub enum AsyncError {
    /// The operation was abandoned because a cancellation signal fired.
    #[error("{0}")]
    Aborted(#[from] AbortReason),

    /// The operation asked the retry engine to stop.
    #[error("{0}")]
    StopRetry(#[from] NonRetryableError),

    /// Invalid configuration or arguments.
    #[error("{0}")]
    Usage(#[from] UsageError),

    /// Any other failure raised by the wrapped operation.
    #[error(transparent)]
    Operation(#[from] anyhow::Error),
}

impl AsyncError {
    /// Returns true if this error was produced by a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Aborted(reason) if reason.is_timeout())
    }
}

/// Error produced when an operation exceeds its time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Operation Timed Out after {}ms", .duration.as_millis())]
pub struct TimeoutError {
    /// The configured timeout.
    pub duration: Duration,
}

impl TimeoutError {
    /// Creates a new timeout error for the given duration.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

/// The reason attached to an aborted [`CancellationSignal`].
///
/// [`CancellationSignal`]: crate::cancellation::CancellationSignal
#[derive(Debug, Clone, Error)]
pub enum AbortReason {
    /// Aborted without an explicit reason.
    #[error("This operation was aborted")]
    Aborted,

    /// Aborted with a message.
    #[error("Operation aborted: {0}")]
    Message(String),

    /// Aborted by a timer.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// Aborted with an arbitrary caller-supplied error.
    #[error(transparent)]
    Custom(Arc<dyn StdError + Send + Sync>),
}

impl AbortReason {
    /// Creates a message reason.
    #[must_use]
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    /// Wraps an arbitrary error as the abort reason.
    #[must_use]
    pub fn custom<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(error))
    }

    /// Returns true if the abort was caused by a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns the timeout details when the abort was caused by a timeout.
    #[must_use]
    pub fn as_timeout(&self) -> Option<&TimeoutError> {
        match self {
            Self::Timeout(err) => Some(err),
            _ => None,
        }
    }
}

impl From<String> for AbortReason {
    fn from(msg: String) -> Self {
        Self::Message(msg)
    }
}

impl From<&str> for AbortReason {
    fn from(msg: &str) -> Self {
        Self::Message(msg.to_string())
    }
}

impl From<AbortReason> for std::io::Error {
    fn from(reason: AbortReason) -> Self {
        let kind = if reason.is_timeout() {
            std::io::ErrorKind::TimedOut
        } else {
            std::io::ErrorKind::Interrupted
        };
        Self::new(kind, reason)
    }
}

/// An error that tells the retry engine to stop immediately.
///
/// Return it (directly, inside [`AsyncError::StopRetry`], or inside an
/// `anyhow::Error`) from an operation wrapped by
/// [`with_retry`](crate::pipeline::with_retry) to skip the remaining attempts.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct NonRetryableError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl NonRetryableError {
    /// Creates a new non-retryable error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Invalid configuration or arguments. Never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UsageError {
    /// A chunk size of zero would never advance.
    #[error("Chunk size must be greater than zero")]
    ZeroChunkSize,

    /// A negative number was supplied where a size was expected.
    #[error("Cant use negative number: {0}")]
    NegativeNumber(f64),

    /// A fractional or non-finite number was supplied where a size was expected.
    #[error("Cant use non-integer number: {0}")]
    NonInteger(f64),

    /// Multi-size chunking needs at least one size.
    #[error("At least one chunk size is required")]
    EmptySizes,

    /// A chunk strategy name that is not one of repeat, stop or swallow.
    #[error("Unknown chunk strategy: {0:?}")]
    UnknownStrategy(String),

    /// Invalid retry configuration.
    #[error("Invalid retry config: {0}")]
    InvalidRetryConfig(String),

    /// An environment variable could not be parsed.
    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnvVar {
        /// The variable name.
        name: String,
        /// The raw value found.
        value: String,
    },
}
