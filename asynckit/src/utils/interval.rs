//! A stream that ticks on a fixed period until its signal fires.

use crate::cancellation::{delay, CancellationSignal};
use crate::errors::AbortReason;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// Ticks every `period`.
///
/// Each item is produced after a fresh delay, so the period is measured from
/// the moment the consumer asks for the next tick. Abort while waiting yields
/// `Err(reason)` once and then ends the stream:
///
/// ```rust,ignore
/// let mut ticks = enumerate_async(interval_loop(Duration::from_millis(200), Some(signal)));
/// while let Some(Step { step, value }) = ticks.next().await {
///     if let Err(reason) = value {
///         info!(%reason, "Done");
///         break;
///     }
///     info!(step, "ping");
/// }
/// ```
pub struct IntervalLoop {
    inner: BoxStream<'static, Result<(), AbortReason>>,
}

/// Creates an [`IntervalLoop`].
pub fn interval_loop(period: Duration, signal: Option<CancellationSignal>) -> IntervalLoop {
    let inner = stream::unfold(Some(signal), move |state| async move {
        let signal = state?;
        match delay(period, signal.as_ref()).await {
            Err(reason) => Some((Err(reason), None)),
            Ok(()) if signal.as_ref().is_some_and(CancellationSignal::is_aborted) => None,
            Ok(()) => Some((Ok(()), Some(signal))),
        }
    })
    .boxed();

    IntervalLoop { inner }
}

impl IntervalLoop {
    /// Waits for the next tick. `None` once the loop has ended.
    pub async fn tick(&mut self) -> Option<Result<(), AbortReason>> {
        self.inner.next().await
    }
}

impl Stream for IntervalLoop {
    type Item = Result<(), AbortReason>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for IntervalLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalLoop").finish_non_exhaustive()
    }
}
