//! Cancellation signal for cooperative cancellation.

use crate::errors::AbortReason;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::warn;

/// A callback invoked with the abort reason.
pub type AbortCallback = Box<dyn Fn(&AbortReason) + Send + Sync>;

/// Handle returned by [`CancellationSignal::on_abort`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Inner {
    /// Whether abort has been requested.
    aborted: AtomicBool,
    /// The reason for abort (first one wins).
    reason: RwLock<Option<AbortReason>>,
    /// Subscribed callbacks, in subscription order.
    callbacks: Mutex<Vec<(SubscriptionId, AbortCallback)>>,
    next_id: AtomicU64,
}

/// A signal for cooperative cancellation.
///
/// Clones share state: aborting one clone aborts them all. Abort is
/// idempotent - only the first reason is kept.
#[derive(Clone, Default)]
pub struct CancellationSignal {
    inner: Arc<Inner>,
}

impl CancellationSignal {
    /// Creates a new, not aborted signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a signal that is already aborted with the given reason.
    #[must_use]
    pub fn aborted(reason: impl Into<AbortReason>) -> Self {
        let signal = Self::new();
        signal.abort(reason);
        signal
    }

    /// Aborts the signal with a reason.
    ///
    /// Subscribed callbacks run synchronously before this returns. A panic in a
    /// callback is logged and suppressed. Calling this again is a no-op.
    pub fn abort(&self, reason: impl Into<AbortReason>) {
        let (reason, callbacks) = {
            let mut callbacks = self.inner.callbacks.lock();
            if self.inner.aborted.swap(true, Ordering::SeqCst) {
                return;
            }
            let reason = reason.into();
            *self.inner.reason.write() = Some(reason.clone());
            (reason, std::mem::take(&mut *callbacks))
        };

        // Callbacks may unsubscribe or subscribe again, so run them unlocked.
        for (_, callback) in &callbacks {
            invoke(callback.as_ref(), &reason);
        }
    }

    /// Aborts the signal without a specific reason.
    pub fn abort_default(&self) {
        self.abort(AbortReason::Aborted);
    }

    /// Returns whether the signal has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Returns the abort reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<AbortReason> {
        self.inner.reason.read().clone()
    }

    /// Registers a callback invoked when the signal aborts.
    ///
    /// If already aborted, the callback is invoked immediately.
    pub fn on_abort<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&AbortReason) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        let reason = {
            let mut callbacks = self.inner.callbacks.lock();
            // Flag and reason are only written while this lock is held.
            if !self.is_aborted() {
                callbacks.push((id, Box::new(callback)));
                return id;
            }
            self.reason()
        };

        if let Some(reason) = reason {
            invoke(&callback, &reason);
        }
        id
    }

    /// Removes a callback. Returns true if it was still subscribed.
    pub fn off_abort(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.inner.callbacks.lock();
        let initial_len = callbacks.len();
        callbacks.retain(|(sub, _)| *sub != id);
        callbacks.len() < initial_len
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.callbacks.lock().len()
    }

    /// Waits until the signal aborts and returns the reason.
    ///
    /// Dropping the future removes its subscription.
    pub async fn cancelled(&self) -> AbortReason {
        if let Some(reason) = self.reason() {
            return reason;
        }

        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let _guard = SubscriptionGuard::new(
            self,
            self.on_abort(move |reason| {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(reason.clone());
                }
            }),
        );

        match rx.await {
            Ok(reason) => reason,
            // The sender lives in the callback list, which only drops it
            // after sending. Never resolves otherwise.
            Err(_) => std::future::pending().await,
        }
    }
}

impl std::fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("aborted", &self.is_aborted())
            .field("reason", &self.reason())
            .finish()
    }
}

/// Removes an abort subscription when dropped.
#[derive(Debug)]
pub struct SubscriptionGuard<'a> {
    signal: &'a CancellationSignal,
    id: SubscriptionId,
}

impl<'a> SubscriptionGuard<'a> {
    /// Ties an existing subscription to the guard's lifetime.
    #[must_use]
    pub fn new(signal: &'a CancellationSignal, id: SubscriptionId) -> Self {
        Self { signal, id }
    }
}

impl Drop for SubscriptionGuard<'_> {
    fn drop(&mut self) {
        self.signal.off_abort(self.id);
    }
}

fn invoke(callback: &(dyn Fn(&AbortReason) + Send + Sync), reason: &AbortReason) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        callback(reason);
    })) {
        warn!("Abort callback panicked: {:?}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_signal_default_not_aborted() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_aborted());
        assert!(signal.reason().is_none());
    }

    #[test]
    fn test_signal_abort() {
        let signal = CancellationSignal::new();
        signal.abort("User requested");

        assert!(signal.is_aborted());
        assert!(matches!(signal.reason(), Some(AbortReason::Message(m)) if m == "User requested"));
    }

    #[test]
    fn test_signal_abort_idempotent() {
        let signal = CancellationSignal::new();
        signal.abort("First reason");
        signal.abort("Second reason");

        // First reason wins
        assert_eq!(signal.reason().map(|r| r.to_string()).as_deref(), Some("Operation aborted: First reason"));
    }

    #[test]
    fn test_clones_share_state() {
        let signal = CancellationSignal::new();
        let other = signal.clone();
        other.abort_default();
        assert!(signal.is_aborted());
        assert!(matches!(signal.reason(), Some(AbortReason::Aborted)));
    }

    #[test]
    fn test_on_abort_before_abort() {
        let signal = CancellationSignal::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        signal.on_abort(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(counter.load(Ordering::SeqCst), 0);

        signal.abort("test");
        signal.abort("again");

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn test_on_abort_after_abort() {
        let signal = CancellationSignal::aborted("test");

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        // Should invoke immediately
        signal.on_abort(move |reason| {
            assert!(matches!(reason, AbortReason::Message(_)));
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn test_off_abort() {
        let signal = CancellationSignal::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let id = signal.on_abort(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(signal.subscriber_count(), 1);
        assert!(signal.off_abort(id));
        assert!(!signal.off_abort(id));

        signal.abort_default();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_guard_unsubscribes_on_drop() {
        let signal = CancellationSignal::new();
        {
            let _guard = SubscriptionGuard::new(&signal, signal.on_abort(|_| {}));
            assert_eq!(signal.subscriber_count(), 1);
        }
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let signal = CancellationSignal::new();
        let inner = signal.clone();
        let id = Arc::new(Mutex::new(None));
        let id_clone = id.clone();

        let sub = signal.on_abort(move |_| {
            if let Some(id) = *id_clone.lock() {
                inner.off_abort(id);
            }
        });
        *id.lock() = Some(sub);

        // Must not deadlock
        signal.abort_default();
        assert!(signal.is_aborted());
    }

    #[test]
    fn test_callback_panic_suppressed() {
        let signal = CancellationSignal::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        signal.on_abort(|_| {
            panic!("Intentional panic");
        });
        signal.on_abort(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Should not panic
        signal.abort("test");
        assert!(signal.is_aborted());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_resolves_with_reason() {
        let signal = CancellationSignal::new();
        let trigger = signal.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.abort("done");
        });

        let reason = signal.cancelled().await;
        assert!(matches!(reason, AbortReason::Message(m) if m == "done"));
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_dropped_early_unsubscribes() {
        let signal = CancellationSignal::new();
        let result = tokio::time::timeout(Duration::from_millis(5), signal.cancelled()).await;
        assert!(result.is_err());
        assert_eq!(signal.subscriber_count(), 0);
    }
}
