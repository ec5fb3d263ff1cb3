//! Search term gating: debounce plus a minimum-length policy.
//!
//! [`OptimizedSearch`] turns raw, per-keystroke text into an *effective*
//! search term that is safe to use as a lookup key:
//!
//! - the raw term updates on every [`set_search_term`](OptimizedSearch::set_search_term)
//! - the debounced term follows it after the configured quiet interval
//! - the effective term is the debounced term when it is empty or at least
//!   `min_search_length` characters long, and empty otherwise
//!
//! Too-short queries are suppressed, not merely delayed. No lookups happen
//! here; callers observe the effective term and decide when to fetch.
//!
//! # Examples
//!
//! ```rust,ignore
//! use querygate::search::OptimizedSearch;
//!
//! let mut search = OptimizedSearch::new("");
//! let mut terms = search.subscribe();
//!
//! search.set_search_term("cor");
//! assert!(search.is_searching());
//!
//! search.settle().await;
//! assert_eq!(search.debounced_search_term(), "cor");
//! assert_eq!(*terms.borrow_and_update(), "cor");
//! ```

use tokio::sync::watch;

use crate::config::PerformanceConfig;
use crate::search::debounce::Debouncer;

/// Debounced, length-gated search state.
#[derive(Debug)]
pub struct OptimizedSearch {
    debouncer: Debouncer<String>,
    min_search_length: usize,
    effective: watch::Sender<String>,
}

impl OptimizedSearch {
    /// Creates a search gate using [`PerformanceConfig::default`].
    pub fn new(initial: impl Into<String>) -> Self {
        Self::with_config(initial, &PerformanceConfig::default())
    }

    /// Creates a search gate from `config`'s debounce delay and minimum length.
    pub fn with_config(initial: impl Into<String>, config: &PerformanceConfig) -> Self {
        let min_search_length = config.min_search_length();
        let debouncer = Debouncer::new(initial.into(), config.debounce_delay());
        let effective = gated(debouncer.settled(), min_search_length).to_owned();
        let (effective, _) = watch::channel(effective);

        Self {
            debouncer,
            min_search_length,
            effective,
        }
    }

    /// The raw term, as last set by the caller.
    pub fn search_term(&self) -> &str {
        self.debouncer.raw()
    }

    /// Sets the raw term and restarts the debounce interval.
    pub fn set_search_term(&mut self, value: impl Into<String>) {
        self.debouncer.set(value.into());
    }

    /// The effective term: debounced and length-gated.
    pub fn debounced_search_term(&self) -> &str {
        gated(self.debouncer.settled(), self.min_search_length)
    }

    /// Returns `true` while the raw term has not settled yet.
    pub fn is_searching(&self) -> bool {
        self.debouncer.raw() != self.debouncer.settled()
    }

    /// Returns `true` if the debounced term passes the length policy.
    pub fn should_search(&self) -> bool {
        passes(self.debouncer.settled(), self.min_search_length)
    }

    /// Minimum accepted length of a non-empty term.
    pub const fn min_search_length(&self) -> usize {
        self.min_search_length
    }

    /// Subscribes to effective-term changes.
    ///
    /// Receivers are notified only when the effective term changes, never
    /// for raw keystrokes or for suppressed short terms.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.effective.subscribe()
    }

    /// Advances the debounce clock.
    ///
    /// Returns the new effective term if it changed.
    pub fn poll(&mut self) -> Option<String> {
        if self.debouncer.poll() {
            self.publish()
        } else {
            None
        }
    }

    /// Waits for the pending interval, then behaves like [`poll`](Self::poll).
    pub async fn settle(&mut self) -> Option<String> {
        if self.debouncer.settle().await {
            self.publish()
        } else {
            None
        }
    }

    /// Settles the raw term immediately, e.g. when the user presses Enter.
    pub fn flush(&mut self) -> Option<String> {
        if self.debouncer.flush() {
            self.publish()
        } else {
            None
        }
    }

    /// Discards the pending keystrokes and restores the last settled term.
    pub fn cancel(&mut self) {
        self.debouncer.cancel();
    }

    fn publish(&self) -> Option<String> {
        let next = self.debounced_search_term();
        let changed = self.effective.send_if_modified(|current| {
            if current.as_str() == next {
                false
            } else {
                next.clone_into(current);
                true
            }
        });

        if changed {
            tracing::debug!(term = next, "effective search term changed");
            Some(next.to_owned())
        } else {
            tracing::trace!(raw = self.search_term(), "search term settled without change");
            None
        }
    }
}

fn passes(term: &str, min_search_length: usize) -> bool {
    term.is_empty() || term.chars().count() >= min_search_length
}

fn gated(term: &str, min_search_length: usize) -> &str {
    if passes(term, min_search_length) { term } else { "" }
}
