//! Keyed request de-duplication with delayed execution.
//!
//! [`QueryBatcher`] coordinates asynchronous lookups that are identified by a
//! string key. It provides two guarantees:
//!
//! 1. **De-duplication**: while a query for a key is outstanding, further
//!    requests for the same key share its eventual outcome instead of
//!    issuing the work again.
//! 2. **Delayed execution**: a new query does not run immediately. It is
//!    scheduled on its own timer and runs once the delay elapses, so a
//!    burst of requests for the same key collapses into one execution.
//!
//! # Lifecycle
//!
//! ```text
//! batch_query(k) ──► Armed ──(delay)──► InFlight ──(settle)──► removed
//!                      │                                  ▲
//!                      └──── clear_batch ─► Cancelled ────┘
//! ```
//!
//! - An armed timer can be cancelled by [`QueryBatcher::clear_batch`]; its
//!   holders observe [`QueryError::Cancelled`].
//! - Once the timer fires the operation is in flight and always runs to
//!   completion. Its key is removed from the registry before the outcome
//!   is delivered, so a caller reacting to the outcome can retry.
//!
//! # Implementation
//!
//! Each key owns its timer, a spawned tokio task, so scheduling one key
//! never disturbs another. The registry and the timer handles live behind a
//! single `parking_lot::Mutex` that is never held across an `.await`.
//! Registrations carry a generation number: a settling operation only
//! removes the registration it created, never a newer one for the same key.
//!
//! # Examples
//!
//! ```rust,ignore
//! use querygate::batch::QueryBatcher;
//!
//! #[tokio::main]
//! async fn main() {
//!     let batcher = QueryBatcher::<String, String>::new();
//!
//!     let first = batcher.batch_query("vehicle:42", || async { Ok("Corolla".to_string()) })?;
//!     // Same key while the first is pending: the closure is not invoked.
//!     let second = batcher.batch_query("vehicle:42", || async { unreachable!() })?;
//!
//!     assert_eq!(first.await, second.await);
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::config::PerformanceConfig;
use crate::error::{BatchError, QueryError};

// =============================================================================
// Type Aliases
// =============================================================================

type Outcome<T, E> = Result<T, QueryError<E>>;

/// A cloneable handle to the outcome of a batched query.
///
/// Every caller that requested the same key while the query was pending
/// receives a clone of the same `PendingQuery`, and all of them resolve to
/// the same outcome.
pub type PendingQuery<T, E> = Shared<BoxFuture<'static, Outcome<T, E>>>;

// =============================================================================
// Registry
// =============================================================================

struct PendingEntry<T, E> {
    generation: u64,
    query: PendingQuery<T, E>,
    /// `Some` while the timer is armed, `None` once the operation is in flight.
    timer: Option<AbortHandle>,
}

struct Registry<T, E> {
    entries: HashMap<String, PendingEntry<T, E>>,
    next_generation: u64,
}

struct Inner<T, E> {
    registry: Mutex<Registry<T, E>>,
    config: PerformanceConfig,
}

impl<T, E> Inner<T, E> {
    /// Marks the timer of `(key, generation)` as fired.
    ///
    /// Returns `false` if the registration is gone, i.e. it was cleared
    /// before the timer fired.
    fn disarm(&self, key: &str, generation: u64) -> bool {
        let mut registry = self.registry.lock();
        match registry.entries.get_mut(key) {
            Some(entry) if entry.generation == generation => {
                entry.timer = None;
                true
            }
            _ => false,
        }
    }

    fn remove(&self, key: &str, generation: u64) {
        let mut registry = self.registry.lock();
        if registry
            .entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
        {
            registry.entries.remove(key);
        }
    }
}

/// Removes a registration when its operation finishes, unwinds or is aborted.
struct Settlement<'a, T, E> {
    inner: &'a Inner<T, E>,
    key: &'a str,
    generation: u64,
}

impl<T, E> Drop for Settlement<'_, T, E> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::warn!(
                key = %self.key,
                generation = self.generation,
                "batched operation panicked"
            );
        }
        self.inner.remove(self.key, self.generation);
    }
}

// =============================================================================
// QueryBatcher
// =============================================================================

/// De-duplicates and delays keyed asynchronous queries.
///
/// `QueryBatcher` is a cheap, cloneable handle: clones share the same
/// registry. Independent batchers do not interact.
///
/// # Type Parameters
///
/// - `T`: The value produced by a successful query.
/// - `E`: The error produced by a failed query.
///
/// Both must be `Clone` because one outcome is handed to every caller that
/// shares the key.
pub struct QueryBatcher<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for QueryBatcher<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for QueryBatcher<T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.lock();
        formatter
            .debug_struct("QueryBatcher")
            .field("pending", &registry.entries.len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<T, E> Default for QueryBatcher<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> QueryBatcher<T, E> {
    /// Creates a batcher using [`PerformanceConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PerformanceConfig::default())
    }

    /// Creates a batcher with the given configuration.
    #[must_use]
    pub fn with_config(config: PerformanceConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry {
                    entries: HashMap::new(),
                    next_generation: 0,
                }),
                config,
            }),
        }
    }

    /// Returns the configuration this batcher was created with.
    #[must_use]
    pub fn config(&self) -> &PerformanceConfig {
        &self.inner.config
    }

    /// Returns the number of keys with an outstanding query.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.registry.lock().entries.len()
    }

    /// Returns `true` if a query for `key` is outstanding.
    #[must_use]
    pub fn is_pending(&self, key: &str) -> bool {
        self.inner.registry.lock().entries.contains_key(key)
    }

    /// Returns the number of timers that have not fired yet.
    #[must_use]
    pub fn armed_timers(&self) -> usize {
        self.inner
            .registry
            .lock()
            .entries
            .values()
            .filter(|entry| entry.timer.is_some())
            .count()
    }

    /// Cancels every armed timer and forgets all pending queries.
    ///
    /// - Holders of a query whose timer had not fired resolve to
    ///   [`QueryError::Cancelled`].
    /// - Operations already in flight keep running and still deliver their
    ///   outcome to the callers holding their [`PendingQuery`].
    ///
    /// After this call a request for any key schedules fresh work.
    ///
    /// Unlike a fire-and-forget clear that leaves aborted awaiters pending
    /// forever, holders of an aborted query are always signaled with
    /// `Cancelled`, so no caller can hang on a query that will never run.
    pub fn clear_batch(&self) {
        let drained: Vec<(String, PendingEntry<T, E>)> =
            self.inner.registry.lock().entries.drain().collect();

        let mut aborted = 0_usize;
        for (key, entry) in drained {
            if let Some(timer) = entry.timer {
                tracing::trace!(key = %key, generation = entry.generation, "aborting armed timer");
                timer.abort();
                aborted += 1;
            }
        }

        tracing::debug!(aborted, "cleared batch registry");
    }

    /// Partitions `items` using the configured batch size.
    ///
    /// See [`batch_array`](super::batch_array).
    pub fn batch_array<I>(&self, items: I) -> Vec<Vec<I::Item>>
    where
        I: IntoIterator,
    {
        super::batch_array(items, self.inner.config.batch_size())
    }

    /// Awaits `futures` chunk by chunk using the configured batch size.
    ///
    /// See [`batch_futures`](super::batch_futures).
    ///
    /// # Errors
    ///
    /// Returns the first error produced by any future.
    pub async fn batch_futures<I, Fut, A, Failure>(&self, futures: I) -> Result<Vec<A>, Failure>
    where
        I: IntoIterator<Item = Fut>,
        Fut: Future<Output = Result<A, Failure>>,
    {
        let batch_size: NonZeroUsize = self.inner.config.batch_size();
        super::batch_futures(futures, batch_size).await
    }
}

impl<T, E> QueryBatcher<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Requests `key`, scheduling `operation` after the configured delay.
    ///
    /// Equivalent to [`batch_query_after`](Self::batch_query_after) with
    /// [`PerformanceConfig::batch_delay`].
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::EmptyKey`] if `key` is empty.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn batch_query<F, Fut>(
        &self,
        key: &str,
        operation: F,
    ) -> Result<PendingQuery<T, E>, BatchError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.batch_query_after(key, operation, self.inner.config.batch_delay())
    }

    /// Requests `key`, scheduling `operation` after `delay`.
    ///
    /// If a query for `key` is already outstanding, its [`PendingQuery`] is
    /// returned and `operation` is dropped without being invoked.
    /// Otherwise a new query is registered and `operation` runs on the
    /// key's own timer once `delay` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::EmptyKey`] if `key` is empty.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn batch_query_after<F, Fut>(
        &self,
        key: &str,
        operation: F,
        delay: Duration,
    ) -> Result<PendingQuery<T, E>, BatchError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if key.is_empty() {
            return Err(BatchError::EmptyKey);
        }

        let mut registry = self.inner.registry.lock();

        if let Some(entry) = registry.entries.get(key) {
            tracing::debug!(key, generation = entry.generation, "joining pending query");
            return Ok(entry.query.clone());
        }

        let generation = registry.next_generation;
        registry.next_generation += 1;

        let (sender, receiver) = oneshot::channel::<Outcome<T, E>>();
        let query: PendingQuery<T, E> = async move {
            receiver
                .await
                .unwrap_or(Err(QueryError::Cancelled))
        }
        .boxed()
        .shared();

        // The registry lock is still held, so the timer cannot observe the
        // registry before its own entry is inserted.
        let timer = tokio::spawn(run_scheduled(
            Arc::clone(&self.inner),
            key.to_owned(),
            generation,
            delay,
            operation,
            sender,
        ));

        registry.entries.insert(
            key.to_owned(),
            PendingEntry {
                generation,
                query: query.clone(),
                timer: Some(timer.abort_handle()),
            },
        );

        tracing::debug!(
            key,
            generation,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "scheduled batched query"
        );

        Ok(query)
    }
}

async fn run_scheduled<T, E, F, Fut>(
    inner: Arc<Inner<T, E>>,
    key: String,
    generation: u64,
    delay: Duration,
    operation: F,
    sender: oneshot::Sender<Outcome<T, E>>,
) where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    tokio::time::sleep(delay).await;

    if !inner.disarm(&key, generation) {
        tracing::trace!(key = %key, generation, "timer fired after clear, skipping");
        return;
    }

    tracing::debug!(key = %key, generation, "running batched query");

    let settlement = Settlement {
        inner: &inner,
        key: &key,
        generation,
    };
    let outcome = operation().await.map_err(QueryError::Failed);
    drop(settlement);

    tracing::debug!(key = %key, generation, ok = outcome.is_ok(), "batched query settled");

    // Every holder may already have dropped its handle.
    let _ = sender.send(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn new_batcher_is_empty() {
        let batcher = QueryBatcher::<i32, String>::new();
        assert_eq!(batcher.pending_len(), 0);
        assert_eq!(batcher.armed_timers(), 0);
        assert!(!batcher.is_pending("anything"));
    }

    #[rstest]
    #[tokio::test]
    async fn empty_key_is_rejected() {
        let batcher = QueryBatcher::<i32, String>::new();
        let result = batcher.batch_query("", || async { Ok(1) });
        assert!(matches!(result, Err(BatchError::EmptyKey)));
        assert_eq!(batcher.pending_len(), 0);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn registration_is_visible_until_settled() {
        let batcher = QueryBatcher::<i32, String>::new();
        let query = batcher
            .batch_query_after("fleet", || async { Ok(3) }, Duration::from_millis(20))
            .unwrap();

        assert!(batcher.is_pending("fleet"));
        assert_eq!(batcher.armed_timers(), 1);

        assert_eq!(query.await, Ok(3));
        assert!(!batcher.is_pending("fleet"));
        assert_eq!(batcher.armed_timers(), 0);
    }

    #[rstest]
    fn debug_shows_pending_count() {
        let batcher = QueryBatcher::<i32, String>::new();
        let debug = format!("{batcher:?}");
        assert!(debug.contains("QueryBatcher"));
        assert!(debug.contains("pending: 0"));
    }

    #[rstest]
    fn clones_share_registry() {
        let batcher = QueryBatcher::<i32, String>::new();
        let clone = batcher.clone();
        assert!(Arc::ptr_eq(&batcher.inner, &clone.inner));
    }
}
