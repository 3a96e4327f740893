//! Cooperative cancellation primitives.
//!
//! This module provides:
//! - CancellationSignal with abort reasons and subscriber notification
//! - run_abortable / run_timeout for racing futures against a signal
//! - delay, a cancellable sleep

mod delay;
mod runner;
mod signal;

pub use delay::delay;
pub use runner::{run_abortable, run_timeout, run_timeout_ms, timeout_from_ms, MAX_TIMEOUT_MS};
pub use signal::{AbortCallback, CancellationSignal, SubscriptionGuard, SubscriptionId};
