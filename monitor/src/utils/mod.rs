//! Shared helpers for the monitor crate.
//!
//! - [`debounce`]: per-key coalescing of rapid file-system events
//! - [`paths`]: documentation, ignored-path and project-name classification

pub mod debounce;
pub mod paths;

pub use debounce::{Debouncer, DebouncerError, DEFAULT_DEBOUNCE_MS};
