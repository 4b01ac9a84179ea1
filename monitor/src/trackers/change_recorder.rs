//! Turns file-change notifications into buffered [`ChangeRecord`]s.
//!
//! For every notification the recorder decides whether the change is worth
//! keeping, quantifies it with the [`DiffExtractor`], credits active time
//! through the [`SessionClock`] and appends the record to the shared buffer.
//!
//! # Skipped Changes
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | path under the store root, `.git`, `target`, `node_modules` | [`SkipReason::Ignored`] |
//! | file no longer exists | [`SkipReason::Missing`] |
//! | metadata cannot be read | [`SkipReason::Unreadable`] |
//! | documentation file with no line delta | [`SkipReason::UnchangedDocumentation`] |
//! | any other file with no line delta | [`SkipReason::NoChange`] |
//!
//! Skipped changes do not touch the session clock.
//!
//! # Locking
//!
//! [`ActivityState`] is shared behind a [`tokio::sync::Mutex`]. The lock is
//! taken only for the clock update and the append, never across the diff,
//! so observations of different files run concurrently.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::diff_extractor::{DiffExtractor, VcsDiff};
use super::session_clock::SessionClock;
use crate::types::ChangeRecord;
use crate::utils::paths::{dotted_extension, is_documentation, is_ignored, project_name_for};

/// Mutable engine state shared by the recorder and the flush cycle.
#[derive(Debug, Default)]
pub struct ActivityState {
    /// Records observed since the last successful flush, in arrival order.
    pub buffer: Vec<ChangeRecord>,

    /// Active-time accounting for the current session.
    pub clock: SessionClock,
}

impl ActivityState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Active minutes accumulated since the last flush.
    #[must_use]
    pub fn session_minutes(&self) -> u64 {
        self.clock.total_active_minutes()
    }
}

/// Why a notification did not produce a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The path is excluded from observation.
    Ignored,
    /// The file no longer exists.
    Missing,
    /// The file's metadata could not be read.
    Unreadable,
    /// A documentation file whose line count did not change.
    UnchangedDocumentation,
    /// The change added and removed nothing.
    NoChange,
}

/// Outcome of observing one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// A record was appended to the buffer.
    Recorded(ChangeRecord),
    /// Nothing was recorded.
    Skipped(SkipReason),
}

impl Observation {
    /// Returns true if a record was appended.
    #[must_use]
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

/// Builds change records from file observations.
#[derive(Debug)]
pub struct ChangeRecorder<D> {
    extractor: DiffExtractor<D>,
    project_name: Option<String>,
    ignored_root: Option<PathBuf>,
}

impl<D: VcsDiff> ChangeRecorder<D> {
    /// Creates a recorder that derives project names from file paths.
    #[must_use]
    pub fn new(extractor: DiffExtractor<D>) -> Self {
        Self {
            extractor,
            project_name: None,
            ignored_root: None,
        }
    }

    /// Attributes every record to the given workspace name.
    #[must_use]
    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    /// Never observes files under `root` (the snapshot store directory).
    #[must_use]
    pub fn with_ignored_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.ignored_root = Some(root.into());
        self
    }

    /// Observes a change to `path` at `now`.
    pub async fn observe(
        &self,
        state: &Mutex<ActivityState>,
        path: &Path,
        now: DateTime<FixedOffset>,
    ) -> Observation {
        if is_ignored(path, self.ignored_root.as_deref()) {
            return Observation::Skipped(SkipReason::Ignored);
        }

        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Observation::Skipped(SkipReason::Ignored),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "File vanished before observation");
                return Observation::Skipped(SkipReason::Missing);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat changed file");
                return Observation::Skipped(SkipReason::Unreadable);
            }
        }

        let diff = self.extractor.extract_change(path).await;
        if diff.is_empty() {
            let reason = if is_documentation(path) {
                SkipReason::UnchangedDocumentation
            } else {
                SkipReason::NoChange
            };
            return Observation::Skipped(reason);
        }

        let mut state = state.lock().await;
        let duration_minutes = state.clock.accumulate(now);
        let record = ChangeRecord {
            timestamp: now,
            file_path: path.to_string_lossy().into_owned(),
            file_extension: dotted_extension(path),
            project_name: project_name_for(path, self.project_name.as_deref()),
            lines_added: diff.lines_added,
            lines_removed: diff.lines_removed,
            added_content: diff.added_content,
            removed_content: diff.removed_content,
            duration_minutes,
        };
        state.buffer.push(record.clone());

        debug!(
            path = %path.display(),
            lines_added = record.lines_added,
            lines_removed = record.lines_removed,
            minutes = duration_minutes,
            buffered = state.buffer.len(),
            "Recorded change"
        );

        Observation::Recorded(record)
    }

    /// Forgets cached state for a removed file.
    pub async fn forget(&self, path: &Path) {
        self.extractor.forget(path).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trackers::diff_extractor::{DiffError, LineCountOnly};
    use chrono::{Duration, TimeZone};
    use std::fs;
    use tempfile::TempDir;

    fn at_minutes(mins: i64) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
            .unwrap()
            + Duration::minutes(mins)
    }

    fn recorder() -> ChangeRecorder<LineCountOnly> {
        ChangeRecorder::new(DiffExtractor::new(LineCountOnly))
    }

    struct StaticDiff(&'static str);

    impl VcsDiff for StaticDiff {
        async fn diff_file(&self, _path: &Path) -> Result<String, DiffError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn records_change_and_credits_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.ts");
        let state = Mutex::new(ActivityState::new());
        let recorder = recorder().with_project_name("demo");

        fs::write(&path, "one\ntwo\n").unwrap();
        let first = recorder.observe(&state, &path, at_minutes(0)).await;
        fs::write(&path, "one\ntwo\nthree\n").unwrap();
        let second = recorder.observe(&state, &path, at_minutes(2)).await;

        assert!(first.is_recorded());
        let Observation::Recorded(record) = second else {
            panic!("expected a record, got {second:?}");
        };
        assert_eq!(record.lines_added, 1);
        assert_eq!(record.duration_minutes, 2);
        assert_eq!(record.file_extension, ".ts");
        assert_eq!(record.project_name, "demo");

        let state = state.lock().await;
        assert_eq!(state.buffer.len(), 2);
        assert_eq!(state.session_minutes(), 2);
    }

    #[tokio::test]
    async fn diff_content_is_carried_into_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lib.rs");
        fs::write(&path, "fn x() {}\n").unwrap();
        let state = Mutex::new(ActivityState::new());
        let recorder = ChangeRecorder::new(DiffExtractor::new(StaticDiff("+fn y() {}\n-fn x() {}\n")));

        let Observation::Recorded(record) = recorder.observe(&state, &path, at_minutes(0)).await else {
            panic!("expected a record");
        };

        assert_eq!(record.added_content, vec!["fn y() {}"]);
        assert_eq!(record.removed_content, vec!["fn x() {}"]);
    }

    #[tokio::test]
    async fn missing_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let state = Mutex::new(ActivityState::new());

        let outcome = recorder()
            .observe(&state, &dir.path().join("gone.rs"), at_minutes(0))
            .await;

        assert_eq!(outcome, Observation::Skipped(SkipReason::Missing));
        assert!(state.lock().await.buffer.is_empty());
    }

    #[tokio::test]
    async fn unchanged_readme_is_skipped_without_touching_clock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("README.md");
        let state = Mutex::new(ActivityState::new());
        let recorder = recorder();

        fs::write(&path, "# Title\n").unwrap();
        recorder.observe(&state, &path, at_minutes(0)).await;
        fs::write(&path, "# Other\n").unwrap();
        let outcome = recorder.observe(&state, &path, at_minutes(1)).await;

        assert_eq!(outcome, Observation::Skipped(SkipReason::UnchangedDocumentation));
        let state = state.lock().await;
        assert_eq!(state.buffer.len(), 1);
        assert_eq!(state.clock.last_activity(), Some(at_minutes(0)));
    }

    #[tokio::test]
    async fn zero_delta_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.rs");
        let state = Mutex::new(ActivityState::new());
        let recorder = recorder();

        fs::write(&path, "a\n").unwrap();
        recorder.observe(&state, &path, at_minutes(0)).await;
        fs::write(&path, "b\n").unwrap();
        let outcome = recorder.observe(&state, &path, at_minutes(1)).await;

        assert_eq!(outcome, Observation::Skipped(SkipReason::NoChange));
    }

    #[tokio::test]
    async fn store_root_is_ignored() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("store");
        fs::create_dir_all(store.join("2024-03-01")).unwrap();
        let path = store.join("2024-03-01").join("activity.json");
        fs::write(&path, "{}").unwrap();
        let state = Mutex::new(ActivityState::new());

        let outcome = recorder()
            .with_ignored_root(&store)
            .observe(&state, &path, at_minutes(0))
            .await;

        assert_eq!(outcome, Observation::Skipped(SkipReason::Ignored));
    }

    #[tokio::test]
    async fn directories_are_not_observed() {
        let dir = TempDir::new().unwrap();
        let state = Mutex::new(ActivityState::new());

        let outcome = recorder().observe(&state, dir.path(), at_minutes(0)).await;

        assert_eq!(outcome, Observation::Skipped(SkipReason::Ignored));
    }
}
