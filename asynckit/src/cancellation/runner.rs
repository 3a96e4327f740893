//! Abortable and timeout-guarded execution.
//!
//! A timeout is an automatically fired [`CancellationSignal`], so both
//! runners fail with an [`AbortReason`].

use super::CancellationSignal;
use crate::errors::{AbortReason, TimeoutError};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Largest timeout, in milliseconds, that still arms a timer (2^53 - 1).
///
/// Durations at or above this mean "no timeout".
pub const MAX_TIMEOUT_MS: u64 = (1 << 53) - 1;

/// Races a future against a cancellation signal.
///
/// If the signal is already aborted the future is never polled. Cancellation
/// is cooperative: losing the race only drops the future.
pub async fn run_abortable<F>(future: F, signal: &CancellationSignal) -> Result<F::Output, AbortReason>
where
    F: Future,
{
    if let Some(reason) = signal.reason() {
        return Err(reason);
    }

    // `cancelled` owns the subscription and releases it whichever branch wins.
    tokio::select! {
        biased;
        output = future => Ok(output),
        reason = signal.cancelled() => Err(reason),
    }
}

/// Runs a future with a timeout.
///
/// Durations at or beyond [`MAX_TIMEOUT_MS`] await the future directly.
pub async fn run_timeout<F>(future: F, duration: Duration) -> Result<F::Output, AbortReason>
where
    F: Future,
{
    if duration.as_millis() >= u128::from(MAX_TIMEOUT_MS) {
        return Ok(future.await);
    }

    let signal = CancellationSignal::new();
    let timer = {
        let signal = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            debug!(
                timeout_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                "Operation timed out"
            );
            signal.abort(TimeoutError::new(duration));
        })
    };
    let _timer = TimerGuard(timer);

    run_abortable(future, &signal).await
}

/// Runs a future with a timeout given in milliseconds.
///
/// Negative, non-finite, or too large values await the future directly.
pub async fn run_timeout_ms<F>(future: F, timeout_ms: f64) -> Result<F::Output, AbortReason>
where
    F: Future,
{
    match timeout_from_ms(timeout_ms) {
        Some(duration) => run_timeout(future, duration).await,
        None => Ok(future.await),
    }
}

/// Converts a millisecond value into a timeout, `None` meaning unbounded.
#[must_use]
pub fn timeout_from_ms(timeout_ms: f64) -> Option<Duration> {
    #[allow(clippy::cast_precision_loss)]
    let max = MAX_TIMEOUT_MS as f64;
    if !timeout_ms.is_finite() || timeout_ms < 0.0 || timeout_ms >= max {
        return None;
    }
    Some(Duration::from_secs_f64(timeout_ms / 1000.0))
}

/// Aborts the timer task when the run finishes.
struct TimerGuard(tokio::task::JoinHandle<()>);

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}
