//! Debounced, length-gated search input.
//!
//! - [`debounce`]: the generic [`Debouncer`] primitive
//! - [`gate`]: [`OptimizedSearch`], which layers a minimum-length policy on
//!   top of a debounced string

pub mod debounce;
pub mod gate;

pub use debounce::{DebounceState, Debouncer};
pub use gate::OptimizedSearch;
