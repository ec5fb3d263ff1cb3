//! Tuning knobs shared by the batcher and the search gate.
//!
//! A single [`PerformanceConfig`] carries every default the crate consumes:
//!
//! - `batch_delay_ms`: quiet period before a batched query runs
//! - `batch_size`: default chunk size for [`batch_array`](crate::batch::batch_array)
//!   and [`batch_futures`](crate::batch::batch_futures)
//! - `debounce_delay_ms`: quiet interval for the search gate
//! - `min_search_length`: shortest search term that is allowed through
//!
//! With the `serde` feature enabled the config can be deserialized from any
//! serde format. Missing fields fall back to their defaults and a zero
//! `batch_size` is rejected.
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use querygate::config::PerformanceConfig;
//!
//! let config = PerformanceConfig::default()
//!     .with_debounce_delay(Duration::from_millis(150))
//!     .with_min_search_length(3);
//!
//! assert_eq!(config.debounce_delay(), Duration::from_millis(150));
//! assert_eq!(config.min_search_length(), 3);
//! ```

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::error::BatchError;

const DEFAULT_BATCH_DELAY_MS: u64 = 50;
const DEFAULT_BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(10).unwrap();
const DEFAULT_DEBOUNCE_DELAY_MS: u64 = 300;
const DEFAULT_MIN_SEARCH_LENGTH: usize = 2;

/// Static configuration for request coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PerformanceConfig {
    batch_delay_ms: u64,
    batch_size: NonZeroUsize,
    debounce_delay_ms: u64,
    min_search_length: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            batch_delay_ms: DEFAULT_BATCH_DELAY_MS,
            batch_size: DEFAULT_BATCH_SIZE,
            debounce_delay_ms: DEFAULT_DEBOUNCE_DELAY_MS,
            min_search_length: DEFAULT_MIN_SEARCH_LENGTH,
        }
    }
}

impl PerformanceConfig {
    /// Creates a config from raw values.
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is 0. Use [`try_new`](Self::try_new) for a
    /// non-panicking version.
    #[must_use]
    pub fn new(
        batch_delay: Duration,
        batch_size: usize,
        debounce_delay: Duration,
        min_search_length: usize,
    ) -> Self {
        Self::try_new(batch_delay, batch_size, debounce_delay, min_search_length)
            .expect("PerformanceConfig batch_size must be greater than 0")
    }

    /// Tries to create a config from raw values.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidBatchSize`] if `batch_size` is 0.
    pub fn try_new(
        batch_delay: Duration,
        batch_size: usize,
        debounce_delay: Duration,
        min_search_length: usize,
    ) -> Result<Self, BatchError> {
        let batch_size = NonZeroUsize::new(batch_size).ok_or(BatchError::InvalidBatchSize)?;
        Ok(Self {
            batch_delay_ms: duration_to_millis(batch_delay),
            batch_size,
            debounce_delay_ms: duration_to_millis(debounce_delay),
            min_search_length,
        })
    }

    /// Default delay before a batched query runs.
    #[must_use]
    #[inline]
    pub const fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// Default chunk size for batch helpers.
    #[must_use]
    #[inline]
    pub const fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    /// Quiet interval the search gate waits for before publishing.
    #[must_use]
    #[inline]
    pub const fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    /// Shortest non-empty search term that is allowed through.
    #[must_use]
    #[inline]
    pub const fn min_search_length(&self) -> usize {
        self.min_search_length
    }

    /// Sets the default batch delay.
    #[must_use]
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay_ms = duration_to_millis(delay);
        self
    }

    /// Sets the default batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the search debounce interval.
    #[must_use]
    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay_ms = duration_to_millis(delay);
        self
    }

    /// Sets the minimum search term length.
    #[must_use]
    pub const fn with_min_search_length(mut self, length: usize) -> Self {
        self.min_search_length = length;
        self
    }
}

// Saturates instead of truncating for absurdly long durations.
fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn default_values() {
        let config = PerformanceConfig::default();
        assert_eq!(config.batch_delay(), Duration::from_millis(50));
        assert_eq!(config.batch_size().get(), 10);
        assert_eq!(config.debounce_delay(), Duration::from_millis(300));
        assert_eq!(config.min_search_length(), 2);
    }

    #[rstest]
    fn try_new_rejects_zero_batch_size() {
        let result = PerformanceConfig::try_new(
            Duration::from_millis(10),
            0,
            Duration::from_millis(10),
            1,
        );
        assert_eq!(result, Err(BatchError::InvalidBatchSize));
    }

    #[rstest]
    #[should_panic(expected = "PerformanceConfig batch_size must be greater than 0")]
    fn new_panics_on_zero_batch_size() {
        let _ = PerformanceConfig::new(Duration::ZERO, 0, Duration::ZERO, 0);
    }

    #[rstest]
    fn builders_override_fields() {
        let config = PerformanceConfig::default()
            .with_batch_delay(Duration::from_millis(5))
            .with_batch_size(NonZeroUsize::new(3).unwrap())
            .with_debounce_delay(Duration::from_millis(120))
            .with_min_search_length(4);

        assert_eq!(
            config,
            PerformanceConfig::new(
                Duration::from_millis(5),
                3,
                Duration::from_millis(120),
                4
            )
        );
    }

    #[rstest]
    fn sub_millisecond_delays_round_down() {
        let config = PerformanceConfig::default().with_batch_delay(Duration::from_micros(900));
        assert_eq!(config.batch_delay(), Duration::ZERO);
    }
}
