//! Chunking with a cycling list of sizes.

use super::ChunkSize;
use crate::errors::UsageError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What happens once the size list has been used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Cycle through the sizes again until the input is exhausted.
    #[default]
    Repeat,
    /// Stop after one pass, dropping whatever input remains.
    Stop,
    /// Stop after one pass, then emit all remaining input as one chunk.
    Swallow,
}

impl FromStr for ChunkStrategy {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "repeat" => Ok(Self::Repeat),
            "stop" => Ok(Self::Stop),
            "swallow" => Ok(Self::Swallow),
            other => Err(UsageError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Iterator returned by [`chunk_multi_sizes`].
#[derive(Debug, Clone)]
pub struct MultiSizeChunks<'a, T> {
    inputs: &'a [T],
    sizes: Vec<usize>,
    strategy: ChunkStrategy,
    /// Index into `sizes` of the next chunk.
    next_size: usize,
    /// Start of the next chunk in `inputs`.
    cursor: usize,
    done: bool,
}

/// Slices `inputs` into chunks whose sizes cycle through `sizes`.
///
/// ```rust,ignore
/// let input: Vec<u32> = (1..=10).collect();
/// let chunks: Vec<_> = chunk_multi_sizes(&input, &[3, 2], ChunkStrategy::Swallow)?.collect();
/// // [1, 2, 3], [4, 5], [6, 7, 8, 9, 10]
/// ```
pub fn chunk_multi_sizes<'a, T>(
    inputs: &'a [T],
    sizes: &[usize],
    strategy: ChunkStrategy,
) -> Result<MultiSizeChunks<'a, T>, UsageError> {
    if sizes.is_empty() {
        return Err(UsageError::EmptySizes);
    }
    let sizes = sizes
        .iter()
        .map(|&size| ChunkSize::new(size).map(ChunkSize::get))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MultiSizeChunks {
        inputs,
        sizes,
        strategy,
        next_size: 0,
        cursor: 0,
        done: false,
    })
}

impl<'a, T> MultiSizeChunks<'a, T> {
    fn take(&mut self, size: usize) -> &'a [T] {
        let end = self.cursor.saturating_add(size).min(self.inputs.len());
        let chunk = &self.inputs[self.cursor..end];
        self.cursor = end;
        chunk
    }
}

impl<'a, T> Iterator for MultiSizeChunks<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.cursor >= self.inputs.len() {
            self.done = true;
            return None;
        }

        if self.next_size == self.sizes.len() {
            match self.strategy {
                ChunkStrategy::Repeat => self.next_size = 0,
                ChunkStrategy::Stop => {
                    self.done = true;
                    return None;
                }
                ChunkStrategy::Swallow => {
                    self.done = true;
                    let rest = self.inputs.len() - self.cursor;
                    return Some(self.take(rest));
                }
            }
        }

        let size = self.sizes[self.next_size];
        self.next_size += 1;
        Some(self.take(size))
    }
}

impl<T> std::iter::FusedIterator for MultiSizeChunks<'_, T> {}
