//! Cancellable sleep.

use super::CancellationSignal;
use crate::errors::AbortReason;
use std::time::Duration;

/// Sleeps for `duration`, or fails with the signal's reason if it fires first.
///
/// An already aborted signal fails immediately without arming a timer.
pub async fn delay(duration: Duration, signal: Option<&CancellationSignal>) -> Result<(), AbortReason> {
    let Some(signal) = signal else {
        tokio::time::sleep(duration).await;
        return Ok(());
    };

    if let Some(reason) = signal.reason() {
        return Err(reason);
    }

    tokio::select! {
        () = tokio::time::sleep(duration) => Ok(()),
        reason = signal.cancelled() => Err(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_delay_without_signal() {
        let start = Instant::now();
        delay(Duration::from_millis(100), None).await.expect("no signal");
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_completes_before_abort() {
        let signal = CancellationSignal::new();
        assert!(delay(Duration::from_millis(100), Some(&signal)).await.is_ok());
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_delay_already_aborted() {
        let signal = CancellationSignal::aborted("gone");
        let start = std::time::Instant::now();
        let result = delay(Duration::from_secs(60), Some(&signal)).await;
        assert!(matches!(result, Err(AbortReason::Message(m)) if m == "gone"));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_aborted_midway() {
        let signal = CancellationSignal::new();
        let trigger = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.abort_default();
        });

        let start = Instant::now();
        let result = delay(Duration::from_secs(10), Some(&signal)).await;
        assert!(matches!(result, Err(AbortReason::Aborted)));
        assert!(start.elapsed() < Duration::from_secs(10));
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_delay_is_pending_until_elapsed() {
        let signal = CancellationSignal::new();
        let mut task = tokio_test::task::spawn(delay(Duration::from_secs(60), Some(&signal)));
        tokio_test::assert_pending!(task.poll());
        assert_eq!(signal.subscriber_count(), 1);

        signal.abort("stop");
        assert!(task.is_woken());
        let result = tokio_test::assert_ready!(task.poll());
        assert!(result.is_err());
        drop(task);
        assert_eq!(signal.subscriber_count(), 0);
    }
}
