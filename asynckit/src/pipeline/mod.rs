//! Batch processing and retries.
//!
//! This module provides:
//! - Fixed-size and multi-size chunking
//! - Chunked pipelines, per chunk or per element
//! - Retry with linear or exponential backoff and jitter

mod chunks;
mod multi_size;
mod retry;


pub use chunks::{
    chunk_all, chunk_each_collect, chunk_each_stream, chunk_operation_collect,
    chunk_operation_stream, chunks, ChunkSize,
};
pub use multi_size::{chunk_multi_sizes, ChunkStrategy, MultiSizeChunks};
pub use retry::{with_retry, Retry, RetryClass, RetryClassify, RetryConfig, RetryType};
