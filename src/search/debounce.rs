//! A generic debounce primitive.
//!
//! [`Debouncer`] tracks a raw value that may change at a high rate and a
//! settled value that only follows the raw value once it has stopped
//! changing for a configured interval.
//!
//! # State Machine
//!
//! ```text
//!            set(v)               deadline elapsed + poll
//!   Idle ─────────────► Debouncing ───────────────────────► Idle
//!                        │  ▲
//!                        └──┘ set(v') restarts the deadline
//! ```
//!
//! The debouncer is clock driven rather than callback driven: nothing
//! happens until [`poll`](Debouncer::poll) observes an elapsed deadline or
//! [`settle`](Debouncer::settle) sleeps until it. Time is read through
//! [`tokio::time::Instant`], so a paused tokio clock drives it
//! deterministically in tests.

use std::time::Duration;

use tokio::time::Instant;

/// Whether a change is waiting for its quiet interval to elapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    /// No pending change.
    Idle,
    /// A change occurred and its deadline has not been observed yet.
    Debouncing,
}

/// Holds a raw value and its debounced counterpart.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
/// use querygate::search::debounce::Debouncer;
///
/// let mut debouncer = Debouncer::new(0_u32, Duration::from_millis(100));
/// debouncer.set(1);
/// debouncer.set(2);
/// assert!(debouncer.settle().await);
/// assert_eq!(*debouncer.settled(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    raw: T,
    settled: T,
    deadline: Option<Instant>,
}

impl<T: Clone + PartialEq> Debouncer<T> {
    /// Creates an idle debouncer whose raw and settled values are `initial`.
    pub fn new(initial: T, delay: Duration) -> Self {
        Self {
            delay,
            raw: initial.clone(),
            settled: initial,
            deadline: None,
        }
    }

    /// The quiet interval.
    #[must_use]
    #[inline]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// The most recent value passed to [`set`](Self::set).
    #[inline]
    pub const fn raw(&self) -> &T {
        &self.raw
    }

    /// The last value that stayed unchanged for the full interval.
    #[inline]
    pub const fn settled(&self) -> &T {
        &self.settled
    }

    /// Current state of the debouncer.
    #[must_use]
    pub const fn state(&self) -> DebounceState {
        if self.deadline.is_some() {
            DebounceState::Debouncing
        } else {
            DebounceState::Idle
        }
    }

    /// Returns `true` if a change is waiting to settle.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Records a new raw value and restarts the quiet interval.
    ///
    /// Setting the value it already holds is a no-op and does not restart
    /// a running interval.
    pub fn set(&mut self, value: T) {
        if value == self.raw {
            return;
        }
        self.raw = value;
        self.deadline = Some(Instant::now() + self.delay);
    }

    /// Publishes the raw value if its interval has elapsed.
    ///
    /// Returns `true` only when the settled value actually changed.
    pub fn poll(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => self.publish(),
            _ => false,
        }
    }

    /// Waits for the pending interval, if any, then polls.
    ///
    /// Returns immediately with `false` when idle.
    pub async fn settle(&mut self) -> bool {
        if let Some(deadline) = self.deadline {
            tokio::time::sleep_until(deadline).await;
        }
        self.poll()
    }

    /// Publishes the raw value immediately, skipping the interval.
    pub fn flush(&mut self) -> bool {
        if self.deadline.is_some() {
            self.publish()
        } else {
            false
        }
    }

    /// Drops the pending change and reverts the raw value to the settled one.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.raw = self.settled.clone();
    }

    /// Time left before the pending change settles.
    ///
    /// Returns `None` when idle.
    #[must_use]
    pub fn time_remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    fn publish(&mut self) -> bool {
        self.deadline = None;
        if self.raw == self.settled {
            return false;
        }
        self.settled = self.raw.clone();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const DELAY: Duration = Duration::from_millis(100);

    #[rstest]
    fn new_debouncer_is_idle() {
        let debouncer = Debouncer::new("x", DELAY);
        assert_eq!(debouncer.state(), DebounceState::Idle);
        assert_eq!(*debouncer.raw(), "x");
        assert_eq!(*debouncer.settled(), "x");
        assert_eq!(debouncer.time_remaining(), None);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn poll_before_deadline_keeps_old_value() {
        let mut debouncer = Debouncer::new(0, DELAY);
        debouncer.set(5);
        tokio::time::advance(Duration::from_millis(99)).await;

        assert!(!debouncer.poll());
        assert_eq!(*debouncer.settled(), 0);
        assert_eq!(debouncer.state(), DebounceState::Debouncing);
        assert_eq!(debouncer.time_remaining(), Some(Duration::from_millis(1)));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn poll_after_deadline_publishes() {
        let mut debouncer = Debouncer::new(0, DELAY);
        debouncer.set(5);
        tokio::time::advance(DELAY).await;

        assert!(debouncer.poll());
        assert_eq!(*debouncer.settled(), 5);
        assert_eq!(debouncer.state(), DebounceState::Idle);
        assert!(!debouncer.poll());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn set_restarts_interval() {
        let mut debouncer = Debouncer::new(0, DELAY);
        debouncer.set(1);
        tokio::time::advance(Duration::from_millis(60)).await;
        debouncer.set(2);
        tokio::time::advance(Duration::from_millis(60)).await;

        assert!(!debouncer.poll());
        tokio::time::advance(Duration::from_millis(40)).await;
        assert!(debouncer.poll());
        assert_eq!(*debouncer.settled(), 2);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn setting_same_value_does_not_restart() {
        let mut debouncer = Debouncer::new(0, DELAY);
        debouncer.set(1);
        tokio::time::advance(Duration::from_millis(60)).await;
        debouncer.set(1);
        tokio::time::advance(Duration::from_millis(40)).await;
        assert!(debouncer.poll());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn reverting_to_settled_value_publishes_nothing() {
        let mut debouncer = Debouncer::new(0, DELAY);
        debouncer.set(1);
        debouncer.set(0);
        assert!(!debouncer.settle().await);
        assert_eq!(debouncer.state(), DebounceState::Idle);
    }

    #[rstest]
    fn flush_publishes_immediately() {
        let mut debouncer = Debouncer::new(String::new(), DELAY);
        debouncer.set("abc".to_string());
        assert!(debouncer.flush());
        assert_eq!(debouncer.settled(), "abc");
        assert!(!debouncer.flush());
    }

    #[rstest]
    fn cancel_reverts_raw_value() {
        let mut debouncer = Debouncer::new(1, DELAY);
        debouncer.set(2);
        debouncer.cancel();
        assert_eq!(*debouncer.raw(), 1);
        assert_eq!(debouncer.state(), DebounceState::Idle);
    }
}
