//! File watcher for a developer workspace.
//!
//! This module watches a workspace directory tree and emits one
//! [`WatchEvent`] per settled file change.
//!
//! # Architecture
//!
//! The [`notify`] callback runs on the watcher's own thread and is kept
//! lightweight: it classifies the raw event, drops ignored paths, stamps the
//! local time and hands the change to a [`Debouncer`] without blocking. The
//! debouncer coalesces bursts for the same path, and a forwarding task turns
//! each settled change into a [`WatchEvent`] on the caller's channel.
//!
//! ```text
//! notify thread ──try_push──▶ Debouncer ──▶ forward task ──▶ event_sender
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::time::Duration;
//! use tokio::sync::mpsc;
//! use codetrack_monitor::watcher::{FileWatcher, WatchEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (tx, mut rx) = mpsc::channel(100);
//!     let _watcher = FileWatcher::new(PathBuf::from("."), None, Duration::from_millis(500), tx)?;
//!
//!     while let Some(event) = rx.recv().await {
//!         match event {
//!             WatchEvent::FileChanged { path, observed_at } => {
//!                 println!("{} changed at {observed_at}", path.display());
//!             }
//!             WatchEvent::FileRemoved(path) => println!("Removed: {}", path.display()),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local};
use notify::{
    event::{CreateKind, ModifyKind, RemoveKind},
    Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::utils::debounce::Debouncer;
use crate::utils::paths::is_ignored;

/// Capacity of the channel between the debouncer and the forwarding task.
const SETTLED_CAPACITY: usize = 256;

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A file was created or its content changed.
    FileChanged {
        /// Path of the changed file.
        path: PathBuf,
        /// Local time of the last raw event in the burst.
        observed_at: DateTime<FixedOffset>,
    },

    /// A file was removed.
    FileRemoved(PathBuf),
}

/// What a raw notify event means for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSignal {
    /// Content may have changed.
    Changed,
    /// The path is gone.
    Removed,
}

#[derive(Debug, Clone, Copy)]
struct RawChange {
    signal: ChangeSignal,
    at: DateTime<FixedOffset>,
}

/// Errors that can occur during file watching operations.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to initialize the file system watcher.
    #[error("failed to create watcher: {0}")]
    WatcherInit(#[from] notify::Error),

    /// The watch directory does not exist or is inaccessible.
    #[error("watch directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),
}

/// Result type for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Classifies a notify event kind.
///
/// Renames count as changes to the destination (editors that save through
/// a temporary file end with a rename). Access and metadata-only events are
/// ignored.
#[must_use]
pub fn classify_event(kind: &EventKind) -> Option<ChangeSignal> {
    match kind {
        EventKind::Create(CreateKind::File | CreateKind::Any)
        | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Name(_)) => {
            Some(ChangeSignal::Changed)
        }
        EventKind::Remove(RemoveKind::File | RemoveKind::Any) => Some(ChangeSignal::Removed),
        _ => None,
    }
}

/// Recursive watcher over a workspace directory.
///
/// Dropping the watcher stops the subscription; the debouncer then flushes
/// any pending changes and the forwarding task exits.
#[derive(Debug)]
pub struct FileWatcher {
    /// Kept alive to maintain the watch subscription.
    _watcher: RecommendedWatcher,

    /// The root directory being watched.
    watch_dir: PathBuf,
}

impl FileWatcher {
    /// Starts watching `watch_dir` recursively.
    ///
    /// Changes under `ignored_root` (the snapshot store) are never emitted.
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The watch directory does not exist
    /// - The file system watcher cannot be initialized
    pub fn new(
        watch_dir: PathBuf,
        ignored_root: Option<PathBuf>,
        debounce: Duration,
        event_sender: mpsc::Sender<WatchEvent>,
    ) -> Result<Self> {
        if !watch_dir.is_dir() {
            return Err(WatcherError::DirectoryNotFound(watch_dir));
        }

        let (settled_tx, settled_rx) = mpsc::channel(SETTLED_CAPACITY);
        let debouncer = Debouncer::new(debounce, settled_tx);
        tokio::spawn(forward_settled(settled_rx, event_sender));

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| {
                handle_notify_event(res, &debouncer, ignored_root.as_deref());
            },
            Config::default(),
        )?;
        watcher.watch(&watch_dir, RecursiveMode::Recursive)?;

        info!(
            watch_dir = %watch_dir.display(),
            debounce_ms = debounce.as_millis(),
            "Initialized file watcher"
        );

        Ok(Self {
            _watcher: watcher,
            watch_dir,
        })
    }

    /// Returns the directory being watched.
    #[must_use]
    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }
}

/// Handles events from the notify crate on the watcher thread.
fn handle_notify_event(
    res: std::result::Result<Event, notify::Error>,
    debouncer: &Debouncer<PathBuf, RawChange>,
    ignored_root: Option<&Path>,
) {
    let event = match res {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "File watcher error");
            return;
        }
    };

    trace!(kind = ?event.kind, paths = ?event.paths, "Received notify event");

    let Some(signal) = classify_event(&event.kind) else {
        return;
    };
    let at = Local::now().fixed_offset();

    for path in event.paths {
        if is_ignored(&path, ignored_root) {
            continue;
        }
        // Never block the notify thread; a dropped burst is picked up by the
        // next save of the same file.
        if let Err(e) = debouncer.try_push(path, RawChange { signal, at }) {
            warn!(error = %e, "Failed to queue file change");
        }
    }
}

/// Turns settled changes into watch events until either side closes.
async fn forward_settled(
    mut settled: mpsc::Receiver<(PathBuf, RawChange)>,
    sender: mpsc::Sender<WatchEvent>,
) {
    while let Some((path, change)) = settled.recv().await {
        let event = match change.signal {
            ChangeSignal::Changed => WatchEvent::FileChanged {
                path,
                observed_at: change.at,
            },
            ChangeSignal::Removed => WatchEvent::FileRemoved(path),
        };
        if sender.send(event).await.is_err() {
            debug!("Watch event receiver closed");
            break;
        }
    }
    debug!("Watch event forwarder shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange, MetadataKind, RenameMode};
    use std::fs;
    use tempfile::TempDir;
    use tokio::time::timeout;

    #[test]
    fn test_classify_content_changes() {
        for kind in [
            EventKind::Create(CreateKind::File),
            EventKind::Create(CreateKind::Any),
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            EventKind::Modify(ModifyKind::Any),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
        ] {
            assert_eq!(classify_event(&kind), Some(ChangeSignal::Changed), "{kind:?}");
        }
    }

    #[test]
    fn test_classify_removal() {
        assert_eq!(
            classify_event(&EventKind::Remove(RemoveKind::File)),
            Some(ChangeSignal::Removed)
        );
    }

    #[test]
    fn test_classify_ignores_noise() {
        for kind in [
            EventKind::Access(AccessKind::Any),
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)),
            EventKind::Create(CreateKind::Folder),
            EventKind::Remove(RemoveKind::Folder),
        ] {
            assert_eq!(classify_event(&kind), None, "{kind:?}");
        }
    }

    #[tokio::test]
    async fn test_missing_directory_rejected() {
        let (tx, _rx) = mpsc::channel(1);
        let result = FileWatcher::new(
            PathBuf::from("/nonexistent/codetrack/workspace"),
            None,
            Duration::from_millis(10),
            tx,
        );

        assert!(matches!(result, Err(WatcherError::DirectoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_write_emits_single_settled_change() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        let watcher = FileWatcher::new(root.clone(), None, Duration::from_millis(100), tx).unwrap();
        assert_eq!(watcher.watch_dir(), root.as_path());

        let path = root.join("main.rs");
        fs::write(&path, "fn main() {}\n").unwrap();
        fs::write(&path, "fn main() {}\nfn other() {}\n").unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("change should be reported")
            .expect("channel open");
        assert!(matches!(event, WatchEvent::FileChanged { path: ref p, .. } if p == &path));
    }

    #[tokio::test]
    async fn test_ignored_root_is_silent() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let store = root.join("store");
        fs::create_dir_all(&store).unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        let _watcher =
            FileWatcher::new(root.clone(), Some(store.clone()), Duration::from_millis(50), tx).unwrap();

        fs::write(store.join("activity.json"), "{}").unwrap();

        assert!(timeout(Duration::from_millis(400), rx.recv()).await.is_err());
    }
}
