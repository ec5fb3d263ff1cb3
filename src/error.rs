//! Error types for batching and batched queries.
//!
//! Two families of errors exist:
//!
//! - [`BatchError`]: the caller misused an API (empty key, zero batch size).
//!   These are reported synchronously, before any work is scheduled.
//! - [`QueryError`]: the outcome of a batched query that did not produce a
//!   value. It is `Clone` so that one outcome can be handed to every caller
//!   sharing the same key.

use std::error::Error;
use std::fmt;

/// Errors caused by invalid arguments to the batching API.
///
/// # Examples
///
/// ```rust
/// use querygate::error::BatchError;
///
/// assert_eq!(
///     BatchError::EmptyKey.to_string(),
///     "batch_query: key must not be empty"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchError {
    /// The query key was the empty string.
    EmptyKey,

    /// The batch size was set to zero.
    ///
    /// Chunking requires a size of at least 1.
    InvalidBatchSize,
}

impl fmt::Display for BatchError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKey => write!(formatter, "batch_query: key must not be empty"),
            Self::InvalidBatchSize => {
                write!(formatter, "batch size must be greater than 0")
            }
        }
    }
}

impl Error for BatchError {}

/// The failure outcome of a batched query.
///
/// # Type Parameters
///
/// - `E`: The error type produced by the caller-supplied operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError<E> {
    /// The operation ran and returned an error.
    Failed(E),

    /// The operation never delivered an outcome.
    ///
    /// Either its timer was cancelled by
    /// [`QueryBatcher::clear_batch`](crate::batch::batcher::QueryBatcher::clear_batch)
    /// before firing, or the operation panicked.
    Cancelled,
}

impl<E> QueryError<E> {
    /// Returns the operation error, if there is one.
    pub fn into_failure(self) -> Option<E> {
        match self {
            Self::Failed(error) => Some(error),
            Self::Cancelled => None,
        }
    }

    /// Returns `true` if the query was cancelled rather than failed.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl<E: fmt::Display> fmt::Display for QueryError<E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(error) => write!(formatter, "batched query failed: {error}"),
            Self::Cancelled => write!(formatter, "batched query was cancelled before settling"),
        }
    }
}

impl<E: Error + 'static> Error for QueryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Failed(error) => Some(error),
            Self::Cancelled => None,
        }
    }
}
