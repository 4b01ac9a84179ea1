//! Error types for the Codetrack Monitor.
//!
//! Each subsystem defines its own error enum next to its code
//! ([`ConfigError`], [`StoreError`], [`WatcherError`](crate::watcher::WatcherError)).
//! [`MonitorError`] gathers the ones the [`report`](crate::report) entry
//! points can produce.

use thiserror::Error;

use crate::config::ConfigError;
use crate::persistence::StoreError;

/// Errors that can occur during monitor operations.
///
/// # Examples
///
/// ```
/// use codetrack_monitor::error::{MonitorError, Result};
///
/// fn parse(raw: &str) -> Result<serde_json::Value> {
///     Ok(serde_json::from_str(raw)?)
/// }
///
/// assert!(matches!(parse("{"), Err(MonitorError::Json(_))));
/// ```
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot store error.
    #[error("snapshot store error: {0}")]
    Store(#[from] StoreError),
}

/// A specialized `Result` type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
