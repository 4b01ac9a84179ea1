//! Configuration module for Codetrack Monitor.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `CODETRACK_DATA_DIR` | No | `~/.code-tracking` | Snapshot store root |
//! | `CODETRACK_WATCH_DIR` | No | current directory | Workspace to watch |
//! | `CODETRACK_PROJECT_NAME` | No | (parent directory) | Project name for every record |
//! | `CODETRACK_FLUSH_INTERVAL_MINS` | No | 5 | Minutes between flushes |
//! | `CODETRACK_DEBOUNCE_MS` | No | 500 | Quiet period before a change is observed |
//! | `CODETRACK_LINE_CACHE_SIZE` | No | 4096 | Files remembered by the line-count fallback |
//!
//! # Example
//!
//! ```no_run
//! use codetrack_monitor::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Snapshots in: {}", config.data_dir.display());
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::BaseDirs;
use thiserror::Error;

use crate::trackers::diff_extractor::DEFAULT_LINE_CACHE_SIZE;
use crate::utils::debounce::DEFAULT_DEBOUNCE_MS;

/// Default snapshot directory name relative to home.
const DEFAULT_DATA_DIR: &str = ".code-tracking";

/// Default minutes between flushes.
const DEFAULT_FLUSH_INTERVAL_MINS: u64 = 5;

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine home directory.
    #[error("failed to determine home directory")]
    NoHomeDirectory,

    /// Failed to determine the current directory.
    #[error("failed to determine current directory: {0}")]
    NoWorkingDirectory(#[source] std::io::Error),
}

/// Configuration for the Codetrack Monitor.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the snapshot store.
    pub data_dir: PathBuf,

    /// Workspace directory to watch recursively.
    pub watch_dir: PathBuf,

    /// Project name attributed to every record.
    /// If `None`, each file's parent directory name is used.
    pub project_name: Option<String>,

    /// Time between flush cycles.
    pub flush_interval: Duration,

    /// Quiet period before a burst of events for one file is observed.
    pub debounce: Duration,

    /// Capacity of the fallback previous-line-count cache.
    pub line_cache_size: usize,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - a numeric variable is set but is not a positive integer
    /// - the home directory cannot be determined (needed for the default data dir)
    /// - the current directory cannot be determined (needed for the default watch dir)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Optional: CODETRACK_DATA_DIR (default: ~/.code-tracking)
        let data_dir = match env::var("CODETRACK_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => {
                let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
                base_dirs.home_dir().join(DEFAULT_DATA_DIR)
            }
        };

        // Optional: CODETRACK_WATCH_DIR (default: current directory)
        let watch_dir = match env::var("CODETRACK_WATCH_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => env::current_dir().map_err(ConfigError::NoWorkingDirectory)?,
        };

        // Optional: CODETRACK_PROJECT_NAME (default: derived per file)
        let project_name = env::var("CODETRACK_PROJECT_NAME")
            .ok()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let flush_mins = positive_var("CODETRACK_FLUSH_INTERVAL_MINS", DEFAULT_FLUSH_INTERVAL_MINS)?;
        let debounce_ms = positive_var("CODETRACK_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)?;
        let line_cache_size = positive_var("CODETRACK_LINE_CACHE_SIZE", DEFAULT_LINE_CACHE_SIZE as u64)?;

        Ok(Self {
            data_dir,
            watch_dir,
            project_name,
            flush_interval: Duration::from_secs(flush_mins * 60),
            debounce: Duration::from_millis(debounce_ms),
            line_cache_size: usize::try_from(line_cache_size).map_err(|_| ConfigError::InvalidValue {
                key: "CODETRACK_LINE_CACHE_SIZE".to_string(),
                message: format!("{line_cache_size} is too large"),
            })?,
        })
    }
}

/// Reads an optional integer variable that must be at least 1.
fn positive_var(key: &str, default: u64) -> Result<u64, ConfigError> {
    let Ok(val) = env::var(key) else {
        return Ok(default);
    };

    let parsed = val.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected positive integer, got '{val}'"),
    })?;
    if parsed == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than 0".to_string(),
        });
    }
    Ok(parsed)
}
