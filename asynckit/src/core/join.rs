//! Keyed "wait for all" over concurrently running futures.

use futures::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

/// Outcome of [`named_join`]: every key lands in exactly one map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSettled<K, T, E>
where
    K: Eq + Hash,
{
    /// Values of the futures that succeeded.
    pub successes: HashMap<K, T>,
    /// Errors of the futures that failed.
    pub fails: HashMap<K, E>,
}

impl<K, T, E> NamedSettled<K, T, E>
where
    K: Eq + Hash,
{
    /// Returns true if no future failed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.fails.is_empty()
    }

    /// Returns the total number of settled futures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.successes.len() + self.fails.len()
    }

    /// Returns true if nothing was joined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the successes when nothing failed, otherwise every failure.
    ///
    /// Never yields a partial successes map.
    pub fn unwrap(self) -> Result<HashMap<K, T>, HashMap<K, E>> {
        if self.fails.is_empty() {
            Ok(self.successes)
        } else {
            Err(self.fails)
        }
    }
}

/// Drives every future concurrently and collects outcomes by key.
///
/// The input is treated as a map: when a key repeats, the last future for
/// it wins and the earlier ones are dropped unpolled.
///
/// ```rust,ignore
/// let settled = named_join([("one", op(1)), ("two", op(2))]).await;
/// if !settled.all_succeeded() {
///     return Err(settled.fails);
/// }
/// ```
pub async fn named_join<K, F, T, E, I>(mapping: I) -> NamedSettled<K, T, E>
where
    I: IntoIterator<Item = (K, F)>,
    K: Eq + Hash,
    F: Future<Output = Result<T, E>>,
{
    let mapping: HashMap<K, F> = mapping.into_iter().collect();
    let (names, futures): (Vec<K>, Vec<F>) = mapping.into_iter().unzip();
    let results = join_all(futures).await;

    let mut settled = NamedSettled {
        successes: HashMap::new(),
        fails: HashMap::new(),
    };
    for (name, result) in names.into_iter().zip(results) {
        match result {
            Ok(value) => {
                settled.successes.insert(name, value);
            }
            Err(err) => {
                settled.fails.insert(name, err);
            }
        }
    }
    settled
}

/// Like [`named_join`], but fails with the whole fails map if any future failed.
pub async fn named_join_unwrap<K, F, T, E, I>(mapping: I) -> Result<HashMap<K, T>, HashMap<K, E>>
where
    I: IntoIterator<Item = (K, F)>,
    K: Eq + Hash,
    F: Future<Output = Result<T, E>>,
{
    named_join(mapping).await.unwrap()
}
