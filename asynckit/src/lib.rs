//! # asynckit
//!
//! Async utilities for batch jobs and services built on tokio.
//!
//! asynckit provides:
//!
//! - **Cancellation**: a cloneable [`CancellationSignal`](cancellation::CancellationSignal)
//!   with abort callbacks, abortable runs, timeouts and cancellable delays
//! - **Safe results**: [`safe_wrap`](core::safe_wrap) turns a fallible future
//!   into a [`SafeResult`](core::SafeResult) that never propagates
//! - **Chunked pipelines**: bounded-concurrency processing of large inputs,
//!   either per chunk or per element
//! - **Retry**: linear or exponential backoff with jitter and per-attempt
//!   timeouts
//! - **Sequences**: lazy enumerate, map, reduce and an abortable interval stream
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use asynckit::prelude::*;
//!
//! let inputs: Vec<u32> = (1..=50).collect();
//! let mut results = chunk_each_stream(&inputs, 10, |n| async move {
//!     process(*n).await
//! })?;
//!
//! while let Some(result) = results.next().await {
//!     match result {
//!         SafeResult::Success(value) => info!(value, "Processed"),
//!         SafeResult::Failure(error) => error!(%error, "Failed"),
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{
        delay, run_abortable, run_timeout, run_timeout_ms, CancellationSignal,
    };
    pub use crate::core::{named_join, named_join_unwrap, safe_wrap, NamedSettled, SafeResult};
    pub use crate::errors::{
        AbortReason, AsyncError, NonRetryableError, TimeoutError, UsageError,
    };
    pub use crate::observability::{init_logging, LogConfig};
    pub use crate::pipeline::{
        chunk_all, chunk_each_collect, chunk_each_stream, chunk_multi_sizes,
        chunk_operation_collect, chunk_operation_stream, with_retry, ChunkStrategy,
        RetryConfig, RetryType,
    };
    pub use crate::utils::{
        enumerate, enumerate_async, interval_loop, map_async, map_lazy, reduce,
        reduce_async, Step,
    };
}
