//! Snapshot storage keyed by date.
//!
//! The engine treats storage as a key-value map from a canonical date key
//! (`YYYY-MM-DD`) to one [`PeriodSnapshot`]. Two implementations ship:
//!
//! - [`JsonFileStore`]: one pretty-printed JSON document per date at
//!   `<root>/<YYYY-MM-DD>/activity.json`
//! - [`MemoryStore`]: an in-process map for tests and embedding
//!
//! # Durability
//!
//! [`JsonFileStore::put`] writes to a temporary file in the target directory
//! and renames it over the destination, so a crash mid-write leaves either
//! the old document or the new one, never a truncated file.
//!
//! # Corrupt Documents
//!
//! A document that cannot be parsed, or whose `date` does not match its
//! key, is reported as absent with a warning. The next successful flush for
//! that date then replaces it.
//!
//! # Example
//!
//! ```no_run
//! use codetrack_monitor::persistence::{JsonFileStore, SnapshotStore};
//! use codetrack_monitor::types::PeriodSnapshot;
//!
//! # fn main() -> Result<(), codetrack_monitor::persistence::StoreError> {
//! let store = JsonFileStore::new("/home/dev/.code-tracking");
//! store.put(&PeriodSnapshot::new("2024-03-01"))?;
//! assert!(store.get("2024-03-01")?.is_some());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::types::PeriodSnapshot;

/// File name of the per-date snapshot document.
pub const SNAPSHOT_FILE_NAME: &str = "activity.json";

/// Errors from reading or writing snapshots.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The per-date directory could not be created.
    #[error("failed to create snapshot directory {}: {source}", path.display())]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing a snapshot document failed.
    #[error("snapshot I/O failed for {}: {source}", path.display())]
    Io {
        /// Document involved.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be serialized.
    #[error("failed to serialize snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value storage of period snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Loads the snapshot stored under `date`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing storage cannot be read.
    /// Missing or corrupt entries are `Ok(None)`.
    fn get(&self, date: &str) -> Result<Option<PeriodSnapshot>, StoreError>;

    /// Stores `snapshot` under its own date, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the snapshot cannot be written.
    fn put(&self, snapshot: &PeriodSnapshot) -> Result<(), StoreError>;
}

/// Filesystem store writing one JSON document per date.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `root`. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document for `date`.
    #[must_use]
    pub fn path_for(&self, date: &str) -> PathBuf {
        self.root.join(date).join(SNAPSHOT_FILE_NAME)
    }
}

impl SnapshotStore for JsonFileStore {
    fn get(&self, date: &str) -> Result<Option<PeriodSnapshot>, StoreError> {
        let path = self.path_for(date);

        if path.is_dir() {
            warn!(path = %path.display(), "Ignoring snapshot path that is a directory");
            return Ok(None);
        }

        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let snapshot: PeriodSnapshot = match serde_json::from_slice(&content) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unparseable snapshot");
                return Ok(None);
            }
        };

        if snapshot.date != date {
            warn!(
                path = %path.display(),
                expected = date,
                found = %snapshot.date,
                "Ignoring snapshot stored under the wrong date"
            );
            return Ok(None);
        }

        Ok(Some(snapshot))
    }

    fn put(&self, snapshot: &PeriodSnapshot) -> Result<(), StoreError> {
        let path = self.path_for(&snapshot.date);
        let dir = self.root.join(&snapshot.date);

        if let Err(source) = std::fs::create_dir_all(&dir) {
            error!(path = %dir.display(), error = %source, "Cannot create snapshot directory");
            return Err(StoreError::CreateDir { path: dir, source });
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        debug!(path = %path.display(), bytes = json.len(), "Snapshot written");
        Ok(())
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, PeriodSnapshot>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns `true` if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, PeriodSnapshot>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, date: &str) -> Result<Option<PeriodSnapshot>, StoreError> {
        Ok(self.entries().get(date).cloned())
    }

    fn put(&self, snapshot: &PeriodSnapshot) -> Result<(), StoreError> {
        self.entries()
            .insert(snapshot.date.clone(), snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProjectStats;
    use std::fs;
    use tempfile::TempDir;

    fn sample(date: &str) -> PeriodSnapshot {
        let mut snapshot = PeriodSnapshot::new(date);
        snapshot.projects.insert(
            "demo".to_string(),
            ProjectStats {
                total_lines_added: 4,
                total_active_time: 2,
                ..ProjectStats::default()
            },
        );
        snapshot.total_projects = 1;
        snapshot.total_active_time = 2;
        snapshot
    }

    #[test]
    fn file_store_round_trips_at_dated_path() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());

        store.put(&sample("2024-03-01")).unwrap();

        let path = dir.path().join("2024-03-01").join("activity.json");
        assert!(path.exists());
        assert_eq!(store.get("2024-03-01").unwrap(), Some(sample("2024-03-01")));
    }

    #[test]
    fn file_store_writes_pretty_camel_case_json() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());

        store.put(&sample("2024-03-01")).unwrap();

        let raw = fs::read_to_string(store.path_for("2024-03-01")).unwrap();
        assert!(raw.contains("\n  \"date\": \"2024-03-01\""));
        assert!(raw.contains("\"totalLinesAdded\": 4"));
    }

    #[test]
    fn file_store_missing_date_is_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());

        assert_eq!(store.get("2024-03-01").unwrap(), None);
    }

    #[test]
    fn file_store_corrupt_document_is_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        let path = store.path_for("2024-03-01");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(store.get("2024-03-01").unwrap(), None);
    }

    #[test]
    fn file_store_non_utf8_document_is_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        let path = store.path_for("2024-03-01");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, [0xff, 0xfe, b'{', 0x80]).unwrap();

        assert_eq!(store.get("2024-03-01").unwrap(), None);

        store.put(&sample("2024-03-01")).unwrap();
        assert_eq!(store.get("2024-03-01").unwrap(), Some(sample("2024-03-01")));
    }

    #[test]
    fn file_store_directory_in_place_of_document_is_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        fs::create_dir_all(store.path_for("2024-03-01")).unwrap();

        assert_eq!(store.get("2024-03-01").unwrap(), None);
    }

    #[test]
    fn file_store_mismatched_date_is_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        let path = store.path_for("2024-03-01");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, serde_json::to_string(&sample("2024-03-02")).unwrap()).unwrap();

        assert_eq!(store.get("2024-03-01").unwrap(), None);
    }

    #[test]
    fn file_store_overwrites_previous_document() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());

        store.put(&sample("2024-03-01")).unwrap();
        let mut updated = sample("2024-03-01");
        updated.total_active_time = 9;
        store.put(&updated).unwrap();

        assert_eq!(store.get("2024-03-01").unwrap().unwrap().total_active_time, 9);
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("2024-03-01"))
            .unwrap()
            .collect();
        assert_eq!(leftovers.len(), 1, "temporary files must not remain");
    }

    #[test]
    fn file_store_reports_uncreatable_directory() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();
        let store = JsonFileStore::new(&blocker);

        let err = store.put(&sample("2024-03-01")).unwrap_err();

        assert!(matches!(err, StoreError::CreateDir { .. }));
    }

    #[test]
    fn memory_store_replaces_by_date() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.put(&sample("2024-03-01")).unwrap();
        store.put(&sample("2024-03-01")).unwrap();
        store.put(&sample("2024-03-02")).unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.get("2024-03-03").unwrap().is_none());
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::CreateDir {
            path: PathBuf::from("/data/2024-03-01"),
            source: std::io::Error::new(ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            err.to_string(),
            "failed to create snapshot directory /data/2024-03-01: denied"
        );
    }
}
