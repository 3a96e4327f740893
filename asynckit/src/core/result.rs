//! Error-as-value result type.

use serde::Serialize;
use std::future::Future;

/// The settled outcome of an operation, returned as a value.
///
/// Exactly one branch is populated. The failure branch holds the raw error
/// the operation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
#[must_use = "a SafeResult carries a failure that should be handled"]
pub enum SafeResult<T, E> {
    /// The operation succeeded.
    Success(T),
    /// The operation failed.
    Failure(E),
}

impl<T, E> SafeResult<T, E> {
    /// Returns true if this is the failure branch.
    #[must_use]
    pub fn has_error(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Returns true if this is the success branch.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the success value, if any.
    #[must_use]
    pub fn result(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// Returns the failure value, if any.
    #[must_use]
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Success(_) => None,
            Self::Failure(err) => Some(err),
        }
    }

    /// Converts into the success value, discarding a failure.
    #[must_use]
    pub fn into_success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// Converts into the failure value, discarding a success.
    #[must_use]
    pub fn into_failure(self) -> Option<E> {
        match self {
            Self::Success(_) => None,
            Self::Failure(err) => Some(err),
        }
    }

    /// Borrows both branches.
    pub fn as_ref(&self) -> SafeResult<&T, &E> {
        match self {
            Self::Success(value) => SafeResult::Success(value),
            Self::Failure(err) => SafeResult::Failure(err),
        }
    }

    /// Maps the success value.
    pub fn map<U, F>(self, f: F) -> SafeResult<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success(value) => SafeResult::Success(f(value)),
            Self::Failure(err) => SafeResult::Failure(err),
        }
    }

    /// Maps the failure value.
    pub fn map_err<G, F>(self, f: F) -> SafeResult<T, G>
    where
        F: FnOnce(E) -> G,
    {
        match self {
            Self::Success(value) => SafeResult::Success(value),
            Self::Failure(err) => SafeResult::Failure(f(err)),
        }
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> Result<T, E> {
        self.into()
    }
}

impl<T, E> From<Result<T, E>> for SafeResult<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::Failure(err),
        }
    }
}

impl<T, E> From<SafeResult<T, E>> for Result<T, E> {
    fn from(result: SafeResult<T, E>) -> Self {
        match result {
            SafeResult::Success(value) => Ok(value),
            SafeResult::Failure(err) => Err(err),
        }
    }
}

/// Awaits a fallible operation and returns its outcome as a value.
///
/// Never fails: an error from the operation lands in
/// [`SafeResult::Failure`].
pub async fn safe_wrap<F, T, E>(operation: F) -> SafeResult<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    operation.await.into()
}
