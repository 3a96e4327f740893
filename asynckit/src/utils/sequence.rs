//! Lazy enumerate, map and reduce over iterators and streams.

use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::future::Future;

/// An element tagged with its 1-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Step<T> {
    /// Position of the element, starting at 1.
    pub step: usize,
    /// The element itself.
    pub value: T,
}

/// Tags every element with its 1-based step.
pub fn enumerate<I>(iter: I) -> impl Iterator<Item = Step<I::Item>>
where
    I: IntoIterator,
{
    iter.into_iter()
        .zip(1..)
        .map(|(value, step)| Step { step, value })
}

/// Stream counterpart of [`enumerate`].
pub fn enumerate_async<S>(stream: S) -> impl Stream<Item = Step<S::Item>>
where
    S: Stream,
{
    stream
        .enumerate()
        .map(|(index, value)| Step { step: index + 1, value })
}

/// Applies `f` to each element as it is pulled.
pub fn map_lazy<I, F, U>(iter: I, f: F) -> impl Iterator<Item = U>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> U,
{
    iter.into_iter().map(f)
}

/// Applies an async `f` to each element as it is pulled, one at a time.
pub fn map_async<S, F, Fut>(stream: S, f: F) -> impl Stream<Item = Fut::Output>
where
    S: Stream,
    F: FnMut(S::Item) -> Fut,
    Fut: Future,
{
    stream.then(f)
}

/// Left fold over an iterator.
pub fn reduce<I, A, F>(iter: I, f: F, init: A) -> A
where
    I: IntoIterator,
    F: FnMut(A, I::Item) -> A,
{
    iter.into_iter().fold(init, f)
}

/// Left fold over a stream with an async combine function.
pub async fn reduce_async<S, A, F, Fut>(stream: S, f: F, init: A) -> A
where
    S: Stream,
    F: FnMut(A, S::Item) -> Fut,
    Fut: Future<Output = A>,
{
    stream.fold(init, f).await
}
