//! Chunked execution helpers and the keyed [`QueryBatcher`].
//!
//! This module provides:
//!
//! - [`batch_array`] / [`try_batch_array`]: split an ordered sequence into
//!   consecutive chunks of bounded size
//! - [`batch_futures`]: run futures chunk by chunk, each chunk concurrently,
//!   preserving input order in the result
//! - [`batcher`]: the de-duplicating, delayed [`QueryBatcher`]
//!
//! # Chunk Ordering
//!
//! `batch_futures` never polls a future of chunk `N` before every future of
//! chunk `N - 1` has completed. Futures are lazy, so a future that belongs
//! to a chunk after a failing one is dropped without ever running.
//!
//! # Examples
//!
//! ```rust
//! use std::num::NonZeroUsize;
//! use querygate::batch::batch_array;
//!
//! let size = NonZeroUsize::new(2).unwrap();
//! assert_eq!(batch_array(1..=5, size), vec![vec![1, 2], vec![3, 4], vec![5]]);
//! ```

pub mod batcher;

use std::future::Future;
use std::num::NonZeroUsize;

use crate::error::BatchError;

pub use batcher::{PendingQuery, QueryBatcher};

/// Partitions `items` into consecutive chunks of at most `batch_size`.
///
/// Order is preserved and only the final chunk may be shorter than
/// `batch_size`. An empty input yields no chunks.
pub fn batch_array<I>(items: I, batch_size: NonZeroUsize) -> Vec<Vec<I::Item>>
where
    I: IntoIterator,
{
    let size = batch_size.get();
    let mut chunks = Vec::new();
    let mut current = Vec::new();

    for item in items {
        current.push(item);
        if current.len() == size {
            chunks.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Like [`batch_array`], but validates a raw `usize` size.
///
/// # Errors
///
/// Returns [`BatchError::InvalidBatchSize`] if `batch_size` is 0.
///
/// # Examples
///
/// ```rust
/// use querygate::batch::try_batch_array;
/// use querygate::error::BatchError;
///
/// assert_eq!(try_batch_array(vec!['a', 'b', 'c'], 2), Ok(vec![vec!['a', 'b'], vec!['c']]));
/// assert_eq!(try_batch_array(vec!['a'], 0), Err(BatchError::InvalidBatchSize));
/// ```
pub fn try_batch_array<I>(items: I, batch_size: usize) -> Result<Vec<Vec<I::Item>>, BatchError>
where
    I: IntoIterator,
{
    let batch_size = NonZeroUsize::new(batch_size).ok_or(BatchError::InvalidBatchSize)?;
    Ok(batch_array(items, batch_size))
}

/// Awaits `futures` chunk by chunk and concatenates their results.
///
/// Futures inside a chunk are polled concurrently. The next chunk starts
/// only after the current chunk has fully completed. The returned vector
/// matches input order regardless of completion order.
///
/// # Errors
///
/// Returns the first error produced by any future. The remaining futures of
/// the failing chunk are dropped and later chunks are never polled.
///
/// # Examples
///
/// ```rust,ignore
/// use std::num::NonZeroUsize;
/// use querygate::batch::batch_futures;
///
/// let lookups = (0..4).map(|id| async move { Ok::<_, String>(id * 10) });
/// let values = batch_futures(lookups, NonZeroUsize::new(2).unwrap()).await?;
/// assert_eq!(values, vec![0, 10, 20, 30]);
/// ```
pub async fn batch_futures<I, Fut, T, E>(futures: I, batch_size: NonZeroUsize) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, E>>,
{
    let chunks = batch_array(futures, batch_size);
    let chunk_count = chunks.len();
    let mut results = Vec::new();

    for (index, chunk) in chunks.into_iter().enumerate() {
        tracing::trace!(chunk = index, of = chunk_count, len = chunk.len(), "running chunk");
        let settled = futures::future::try_join_all(chunk).await?;
        results.extend(settled);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn size(value: usize) -> NonZeroUsize {
        NonZeroUsize::new(value).unwrap()
    }

    #[rstest]
    #[case(vec![], 3, vec![])]
    #[case(vec![1], 3, vec![vec![1]])]
    #[case(vec![1, 2, 3], 3, vec![vec![1, 2, 3]])]
    #[case(vec![1, 2, 3, 4], 3, vec![vec![1, 2, 3], vec![4]])]
    #[case(vec![1, 2, 3, 4], 1, vec![vec![1], vec![2], vec![3], vec![4]])]
    #[case(vec![1, 2], 10, vec![vec![1, 2]])]
    fn batch_array_chunks(
        #[case] items: Vec<i32>,
        #[case] batch_size: usize,
        #[case] expected: Vec<Vec<i32>>,
    ) {
        assert_eq!(batch_array(items, size(batch_size)), expected);
    }

    #[rstest]
    fn batch_array_accepts_huge_batch_size() {
        let chunks = batch_array(vec!["a", "b"], size(usize::MAX));
        assert_eq!(chunks, vec![vec!["a", "b"]]);
    }

    #[rstest]
    fn try_batch_array_rejects_zero() {
        assert_eq!(
            try_batch_array(Vec::<u8>::new(), 0),
            Err(BatchError::InvalidBatchSize)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn batch_futures_empty_input() {
        let futures: Vec<std::future::Ready<Result<i32, ()>>> = Vec::new();
        let results = batch_futures(futures, size(4)).await;
        assert_eq!(results, Ok(Vec::new()));
    }

    #[rstest]
    #[tokio::test]
    async fn batch_futures_propagates_error() {
        let futures = vec![
            std::future::ready(Ok(1)),
            std::future::ready(Err("boom")),
            std::future::ready(Ok(3)),
        ];
        assert_eq!(batch_futures(futures, size(2)).await, Err("boom"));
    }
}
