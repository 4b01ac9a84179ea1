//! Codetrack Monitor - editing activity capture and daily statistics.
//!
//! This crate turns file-change notifications from a developer workspace
//! into durable per-day, per-project statistics.
//!
//! # Overview
//!
//! 1. The [`watcher`] reports settled file changes.
//! 2. The [`trackers::ChangeRecorder`] quantifies each change with a
//!    `git diff` (or a line-count fallback), credits active minutes through
//!    the [`trackers::SessionClock`] and buffers a [`types::ChangeRecord`].
//! 3. On a timer, [`flush::flush`] aggregates the buffer into a
//!    [`types::PeriodSnapshot`] per date, merges it with what the
//!    [`persistence::SnapshotStore`] already holds and writes it back.
//! 4. [`range::read_range`] reads snapshots back for reporting, and the
//!    [`report`] entry points serve them to the command line.
//!
//! # Modules
//!
//! - [`types`]: Change records, project stats, period snapshots
//! - [`trackers`]: Diff extraction, session clock, change recorder
//! - [`stats`]: Aggregation and snapshot merging
//! - [`persistence`]: Snapshot stores (JSON files, in-memory)
//! - [`flush`]: The periodic flush cycle
//! - [`range`]: Date-range reads
//! - [`summary`]: Human-readable summaries
//! - [`report`]: Entry points for the `status` and `report` commands
//! - [`watcher`]: File system watcher for the workspace
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types for monitor operations
//! - [`utils`]: Shared utilities (debouncing, path classification)

pub mod config;
pub mod error;
pub mod flush;
pub mod persistence;
pub mod range;
pub mod report;
pub mod stats;
pub mod summary;
pub mod trackers;
pub mod types;
pub mod utils;
pub mod watcher;

pub use config::Config;
pub use error::{MonitorError, Result};
pub use flush::{flush, FlushReport};
pub use persistence::{JsonFileStore, MemoryStore, SnapshotStore, StoreError};
pub use range::read_range;
pub use trackers::{ActivityState, ChangeRecorder, DiffExtractor, GitCli, Observation};
pub use types::{ChangeKind, ChangeRecord, PeriodSnapshot, ProjectStats};
pub use watcher::{FileWatcher, WatchEvent, WatcherError};
