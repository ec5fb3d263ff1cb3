//! # querygate
//!
//! Client-side request coordination for async applications: keyed request
//! de-duplication, delayed batching and debounced search gating.
//!
//! ## Overview
//!
//! - **Query Batcher**: [`QueryBatcher`](batch::QueryBatcher) shares one
//!   in-flight result between every caller asking for the same key and
//!   delays each new key on its own timer.
//! - **Chunked execution**: [`batch_array`](batch::batch_array) and
//!   [`batch_futures`](batch::batch_futures) split work into bounded,
//!   strictly sequential chunks.
//! - **Search gate**: [`OptimizedSearch`](search::OptimizedSearch) debounces
//!   raw input and suppresses terms shorter than a minimum length.
//! - **Configuration**: [`PerformanceConfig`](config::PerformanceConfig)
//!   carries every default delay, size and length.
//!
//! ## Feature Flags
//!
//! - `serde`: `Serialize`/`Deserialize` for [`PerformanceConfig`](config::PerformanceConfig)
//!
//! ## Logging
//!
//! Events are emitted through [`tracing`]. The crate never installs a
//! subscriber.
//!
//! ## Example
//!
//! ```rust
//! use querygate::prelude::*;
//!
//! let chunks = batch_array(vec![1, 2, 3], PerformanceConfig::default().batch_size());
//! assert_eq!(chunks, vec![vec![1, 2, 3]]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use querygate::prelude::*;
/// ```
pub mod prelude {
    pub use crate::batch::{
        PendingQuery, QueryBatcher, batch_array, batch_futures, try_batch_array,
    };
    pub use crate::config::PerformanceConfig;
    pub use crate::error::{BatchError, QueryError};
    pub use crate::search::{DebounceState, Debouncer, OptimizedSearch};
}

pub mod batch;
pub mod config;
pub mod error;
pub mod search;
