//! Chunked processing of large slices.
//!
//! Two concurrency strategies are offered:
//! - [`chunk_operation_stream`] hands each chunk to the operation, one chunk
//!   at a time.
//! - [`chunk_each_stream`] runs the operation on every element of a chunk
//!   concurrently, waits for the whole chunk, then moves on. At most one
//!   chunk's worth of operations is in flight at any time.
//!
//! Both yield results in input order.

use crate::core::{safe_wrap, SafeResult};
use crate::errors::UsageError;
use crate::utils::reduce_async;
use futures::future::join_all;
use futures::stream::{self, Stream, StreamExt};
use std::future::Future;
use std::num::NonZeroUsize;
use std::slice::Chunks;
use tracing::trace;

/// A validated, non-zero chunk size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkSize(NonZeroUsize);

impl ChunkSize {
    /// Creates a chunk size, rejecting zero.
    pub fn new(size: usize) -> Result<Self, UsageError> {
        NonZeroUsize::new(size)
            .map(Self)
            .ok_or(UsageError::ZeroChunkSize)
    }

    /// Returns the size.
    #[must_use]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl TryFrom<usize> for ChunkSize {
    type Error = UsageError;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        Self::new(size)
    }
}

impl TryFrom<i64> for ChunkSize {
    type Error = UsageError;

    #[allow(clippy::cast_precision_loss)]
    fn try_from(size: i64) -> Result<Self, Self::Error> {
        let size = usize::try_from(size).map_err(|_| UsageError::NegativeNumber(size as f64))?;
        Self::new(size)
    }
}

impl TryFrom<f64> for ChunkSize {
    type Error = UsageError;

    fn try_from(size: f64) -> Result<Self, Self::Error> {
        if size < 0.0 {
            return Err(UsageError::NegativeNumber(size));
        }
        if !size.is_finite() || size.fract() != 0.0 {
            return Err(UsageError::NonInteger(size));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self::new(size as usize)
    }
}

impl From<ChunkSize> for usize {
    fn from(size: ChunkSize) -> Self {
        size.get()
    }
}

/// Lazily slices `inputs` into chunks of up to `size` elements.
///
/// Order is preserved; only the last chunk may be shorter.
pub fn chunks<T>(inputs: &[T], size: usize) -> Result<Chunks<'_, T>, UsageError> {
    let size = ChunkSize::new(size)?;
    Ok(inputs.chunks(size.get()))
}

/// Same as [`chunks`], collected into a `Vec`.
pub fn chunk_all<T>(inputs: &[T], size: usize) -> Result<Vec<&[T]>, UsageError> {
    Ok(chunks(inputs, size)?.collect())
}

/// Runs `operation` on each chunk, one chunk at a time.
///
/// Yields one [`SafeResult`] per chunk. Nothing runs until the stream is
/// polled.
pub fn chunk_operation_stream<'a, T, F, Fut, R, E>(
    inputs: &'a [T],
    size: usize,
    mut operation: F,
) -> Result<impl Stream<Item = SafeResult<R, E>> + 'a, UsageError>
where
    F: FnMut(&'a [T]) -> Fut + 'a,
    Fut: Future<Output = Result<R, E>> + 'a,
    R: 'a,
    E: 'a,
{
    let chunks = chunks(inputs, size)?;
    Ok(stream::iter(chunks).then(move |chunk| safe_wrap(operation(chunk))))
}

/// Runs `operation` on every element, one chunk of concurrent calls at a time.
///
/// Each chunk's operations are launched together and the stream waits for
/// all of them before yielding that chunk's results in input order. The next
/// chunk is not started until the current one has been fully yielded.
pub fn chunk_each_stream<'a, T, F, Fut, R, E>(
    inputs: &'a [T],
    size: usize,
    mut operation: F,
) -> Result<impl Stream<Item = SafeResult<R, E>> + 'a, UsageError>
where
    F: FnMut(&'a T) -> Fut + 'a,
    Fut: Future<Output = Result<R, E>> + 'a,
    R: 'a,
    E: 'a,
{
    let chunks = chunks(inputs, size)?;
    Ok(stream::iter(chunks.enumerate())
        .then(move |(index, chunk)| {
            trace!(chunk = index, len = chunk.len(), "Launching chunk");
            join_all(chunk.iter().map(|item| safe_wrap(operation(item))))
        })
        .flat_map(stream::iter))
}

/// Same as [`chunk_operation_stream`], aggregated into an ordered `Vec`.
pub async fn chunk_operation_collect<'a, T, F, Fut, R, E>(
    inputs: &'a [T],
    size: usize,
    operation: F,
) -> Result<Vec<SafeResult<R, E>>, UsageError>
where
    F: FnMut(&'a [T]) -> Fut + 'a,
    Fut: Future<Output = Result<R, E>> + 'a,
    R: 'a,
    E: 'a,
{
    let results = chunk_operation_stream(inputs, size, operation)?;
    Ok(collect_results(results).await)
}

/// Same as [`chunk_each_stream`], aggregated into an ordered `Vec`.
pub async fn chunk_each_collect<'a, T, F, Fut, R, E>(
    inputs: &'a [T],
    size: usize,
    operation: F,
) -> Result<Vec<SafeResult<R, E>>, UsageError>
where
    F: FnMut(&'a T) -> Fut + 'a,
    Fut: Future<Output = Result<R, E>> + 'a,
    R: 'a,
    E: 'a,
{
    let results = chunk_each_stream(inputs, size, operation)?;
    Ok(collect_results(results).await)
}

async fn collect_results<S>(results: S) -> Vec<S::Item>
where
    S: Stream,
{
    reduce_async(
        results,
        |mut acc, result| async move {
            acc.push(result);
            acc
        },
        Vec::new(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_chunk_size_validation() {
        assert_eq!(ChunkSize::new(3).map(ChunkSize::get), Ok(3));
        assert_eq!(ChunkSize::new(0), Err(UsageError::ZeroChunkSize));
        assert_eq!(ChunkSize::try_from(-4_i64), Err(UsageError::NegativeNumber(-4.0)));
        assert_eq!(ChunkSize::try_from(2.5_f64), Err(UsageError::NonInteger(2.5)));
        assert_eq!(ChunkSize::try_from(-0.5_f64), Err(UsageError::NegativeNumber(-0.5)));
        assert!(matches!(ChunkSize::try_from(f64::NAN), Err(UsageError::NonInteger(_))));
        assert_eq!(ChunkSize::try_from(10.0_f64).map(usize::from), Ok(10));
    }

    #[test]
    fn test_chunks_preserve_order() {
        let input: Vec<u32> = (1..=7).collect();
        let chunked = chunk_all(&input, 3).expect("valid size");
        assert_eq!(chunked, vec![&[1, 2, 3][..], &[4, 5, 6][..], &[7][..]]);
    }

    #[test]
    fn test_chunks_zero_size_is_usage_error() {
        let input = [1, 2, 3];
        assert_eq!(chunks(&input, 0).err(), Some(UsageError::ZeroChunkSize));
    }

    #[test]
    fn test_chunks_empty_input() {
        let input: [u8; 0] = [];
        assert!(chunk_all(&input, 4).expect("valid size").is_empty());
    }

    #[tokio::test]
    async fn test_chunk_operation_receives_whole_chunks() {
        let input: Vec<u32> = (1..=10).collect();
        let results = chunk_operation_collect(&input, 4, |chunk| async move {
            if chunk.contains(&6) {
                Err(format!("bad chunk starting at {}", chunk[0]))
            } else {
                Ok(chunk.iter().sum::<u32>())
            }
        })
        .await
        .expect("valid size");

        assert_eq!(
            results,
            vec![
                SafeResult::Success(10),
                SafeResult::Failure("bad chunk starting at 5".to_string()),
                SafeResult::Success(19),
            ]
        );
    }

    #[tokio::test]
    async fn test_chunk_operation_is_sequential() {
        let input: Vec<u32> = (1..=6).collect();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = chunk_operation_collect(&input, 2, |chunk| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(chunk.len())
            }
        })
        .await
        .expect("valid size");

        assert_eq!(results.len(), 3);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunk_each_yields_in_order_with_failure() {
        let input: Vec<u32> = (1..=23).collect();
        let results = chunk_each_collect(&input, 10, |n| {
            let n = *n;
            async move {
                // Later elements settle first.
                tokio::time::sleep(Duration::from_millis(u64::from(30 - n))).await;
                if n == 13 {
                    Err(format!("element {n} failed"))
                } else {
                    Ok(n * 10)
                }
            }
        })
        .await
        .expect("valid size");

        assert_eq!(results.len(), 23);
        for (index, result) in results.iter().enumerate() {
            let n = u32::try_from(index).expect("small index") + 1;
            if n == 13 {
                assert_eq!(result.error().map(String::as_str), Some("element 13 failed"));
            } else {
                assert_eq!(result.result(), Some(&(n * 10)));
            }
        }
    }

    #[tokio::test]
    async fn test_chunk_each_bounds_concurrency_per_chunk() {
        let input: Vec<u32> = (1..=23).collect();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let batches = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let results = chunk_each_collect(&input, 10, |n| {
            let n = *n;
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            let batches = batches.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                batches.lock().push(now);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(n)
            }
        })
        .await
        .expect("valid size");

        assert_eq!(results.len(), 23);
        assert_eq!(peak.load(Ordering::SeqCst), 10);

        // Every chunk starts from an empty pipeline: sizes 10, 10, 3.
        let starts: Vec<usize> = batches
            .lock()
            .iter()
            .enumerate()
            .filter(|(_, now)| **now == 1)
            .map(|(index, _)| index)
            .collect();
        assert_eq!(starts, vec![0, 10, 20]);
    }

    #[tokio::test]
    async fn test_chunk_each_is_lazy() {
        let input: Vec<u32> = (1..=5).collect();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let mut results = Box::pin(
            chunk_each_stream(&input, 2, move |n| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                let n = *n;
                async move { Ok::<_, String>(n) }
            })
            .expect("valid size"),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let first = results.next().await;
        assert_eq!(first, Some(SafeResult::Success(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let second = results.next().await;
        assert_eq!(second, Some(SafeResult::Success(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_chunk_each_zero_size_fails_before_running() {
        let input = [1, 2, 3];
        let result = chunk_each_collect(&input, 0, |n| {
            let n = *n;
            async move { Ok::<_, String>(n) }
        })
        .await;
        assert_eq!(result.err(), Some(UsageError::ZeroChunkSize));
    }
}
