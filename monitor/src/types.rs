//! Data model for captured editing activity.
//!
//! This module defines the records produced by the change recorder and the
//! aggregates persisted by the snapshot store. All types serialize to
//! camelCase JSON, one [`PeriodSnapshot`] document per calendar date.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Canonical `strftime` format of a snapshot date (`2024-01-31`).
///
/// The formatted string is the identity of a snapshot: it is both the
/// in-memory merge key and the on-disk directory name.
pub const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Language tag used when a file has no extension.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Formats a calendar date as a snapshot key.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use codetrack_monitor::types::date_key;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
/// assert_eq!(date_key(date), "2024-01-02");
/// ```
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    date.format(SNAPSHOT_DATE_FORMAT).to_string()
}

/// Normalizes a file extension into a language tag.
///
/// A single leading dot is stripped and the result is lowercased. Files
/// without an extension map to [`UNKNOWN_LANGUAGE`].
///
/// # Examples
///
/// ```
/// use codetrack_monitor::types::language_tag;
///
/// assert_eq!(language_tag(".ts"), "ts");
/// assert_eq!(language_tag(".RS"), "rs");
/// assert_eq!(language_tag(""), "unknown");
/// ```
#[must_use]
pub fn language_tag(extension: &str) -> String {
    let tag = extension.strip_prefix('.').unwrap_or(extension);
    if tag.is_empty() {
        UNKNOWN_LANGUAGE.to_string()
    } else {
        tag.to_ascii_lowercase()
    }
}

/// Coarse classification of a single change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Only lines were added.
    Create,
    /// Lines were both added and removed.
    Modify,
    /// Only lines were removed.
    Delete,
}

/// One observed, non-trivial edit to a single file.
///
/// Records are immutable once built. They live in the in-memory buffer until
/// a flush folds them into a [`PeriodSnapshot`], where they are kept in the
/// per-file lists of [`ProjectStats::files`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// When the change was observed, in the local offset at that moment.
    pub timestamp: DateTime<FixedOffset>,

    /// Path of the edited file.
    pub file_path: String,

    /// Extension including the leading dot (`.rs`), or empty.
    #[serde(default)]
    pub file_extension: String,

    /// Project the file belongs to.
    pub project_name: String,

    /// Lines added by this change.
    pub lines_added: u32,

    /// Lines removed by this change.
    pub lines_removed: u32,

    /// Added line contents, in diff order. Empty on the fallback path.
    #[serde(default)]
    pub added_content: Vec<String>,

    /// Removed line contents, in diff order. Empty on the fallback path.
    #[serde(default)]
    pub removed_content: Vec<String>,

    /// Active minutes credited by the session clock (`0..=5`).
    #[serde(default)]
    pub duration_minutes: u32,
}

impl ChangeRecord {
    /// Returns the normalized language tag of the edited file.
    #[must_use]
    pub fn language(&self) -> String {
        language_tag(&self.file_extension)
    }

    /// Returns the local hour of day (0-23) the change was observed in.
    #[must_use]
    pub fn hour(&self) -> u8 {
        // hour() is always < 24
        self.timestamp.hour() as u8
    }

    /// Returns the local calendar date the change was observed on.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Returns the total number of changed lines.
    #[must_use]
    pub fn total_lines(&self) -> u32 {
        self.lines_added + self.lines_removed
    }

    /// Classifies the change by the direction of its line deltas.
    #[must_use]
    pub fn change_kind(&self) -> ChangeKind {
        match (self.lines_added, self.lines_removed) {
            (added, 0) if added > 0 => ChangeKind::Create,
            (0, removed) if removed > 0 => ChangeKind::Delete,
            _ => ChangeKind::Modify,
        }
    }
}

/// Per-file line totals for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTotals {
    /// Path of the file.
    pub file_path: String,
    /// Number of recorded changes.
    pub changes: usize,
    /// Sum of added lines.
    pub lines_added: u64,
    /// Sum of removed lines.
    pub lines_removed: u64,
}

/// Aggregated statistics for one project within a period.
///
/// The raw counters and maps are authoritative; [`top_files`](Self::top_files)
/// and [`average_change_size`](Self::average_change_size) are derived views
/// recomputed after every aggregation and merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    /// Running sum of added lines.
    #[serde(default)]
    pub total_lines_added: u64,

    /// Running sum of removed lines.
    #[serde(default)]
    pub total_lines_removed: u64,

    /// Running sum of active minutes.
    #[serde(default)]
    pub total_active_time: u64,

    /// Change records per file path, chronological within each list.
    #[serde(default)]
    pub files: IndexMap<String, Vec<ChangeRecord>>,

    /// Active minutes per language tag.
    #[serde(default)]
    pub language_stats: IndexMap<String, u64>,

    /// Active minutes per local hour of day.
    #[serde(default)]
    pub change_frequency: IndexMap<u8, u64>,

    /// Up to five most frequently changed files.
    #[serde(default)]
    pub top_files: Vec<String>,

    /// Average changed lines per recorded change.
    #[serde(default)]
    pub average_change_size: f64,
}

impl ProjectStats {
    /// Returns the number of recorded changes across all files.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Returns `true` if all three summed counters are zero.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.total_lines_added == 0 && self.total_lines_removed == 0 && self.total_active_time == 0
    }

    /// Returns line totals per file, in first-seen order.
    #[must_use]
    pub fn file_totals(&self) -> Vec<FileTotals> {
        self.files
            .iter()
            .map(|(path, records)| FileTotals {
                file_path: path.clone(),
                changes: records.len(),
                lines_added: records.iter().map(|r| u64::from(r.lines_added)).sum(),
                lines_removed: records.iter().map(|r| u64::from(r.lines_removed)).sum(),
            })
            .collect()
    }
}

/// The durable aggregate of all change records for one calendar date.
///
/// Two snapshots are mergeable if and only if their `date` strings are
/// byte-equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSnapshot {
    /// Canonical date key (see [`SNAPSHOT_DATE_FORMAT`]).
    pub date: String,

    /// Statistics per project name, in first-seen order.
    pub projects: IndexMap<String, ProjectStats>,

    /// Sum of active minutes across projects.
    #[serde(default)]
    pub total_active_time: u64,

    /// Number of projects.
    #[serde(default)]
    pub total_projects: usize,

    /// Number of distinct file paths across projects.
    #[serde(default)]
    pub total_files: usize,

    /// Up to five hours with the most active minutes.
    #[serde(default)]
    pub most_active_hours: Vec<u8>,

    /// Up to five languages with the most active minutes.
    #[serde(default)]
    pub most_used_languages: Vec<String>,
}

impl PeriodSnapshot {
    /// Creates a snapshot with no projects for the given date key.
    #[must_use]
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            projects: IndexMap::new(),
            total_active_time: 0,
            total_projects: 0,
            total_files: 0,
            most_active_hours: Vec::new(),
            most_used_languages: Vec::new(),
        }
    }

    /// Creates an empty snapshot for a calendar date.
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        Self::new(date_key(date))
    }

    /// Parses the date key back into a calendar date.
    #[must_use]
    pub fn naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, SNAPSHOT_DATE_FORMAT).ok()
    }

    /// Returns `true` if the snapshot carries nothing worth persisting.
    ///
    /// A snapshot is empty when it has no projects, or when every project's
    /// added lines, removed lines and active time are all zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projects.values().all(ProjectStats::is_idle)
    }

    /// Sum of added lines across projects.
    #[must_use]
    pub fn total_lines_added(&self) -> u64 {
        self.projects.values().map(|p| p.total_lines_added).sum()
    }

    /// Sum of removed lines across projects.
    #[must_use]
    pub fn total_lines_removed(&self) -> u64 {
        self.projects.values().map(|p| p.total_lines_removed).sum()
    }

    /// Number of distinct file paths across all projects.
    #[must_use]
    pub fn distinct_file_count(&self) -> usize {
        self.projects
            .values()
            .flat_map(|p| p.files.keys())
            .map(String::as_str)
            .collect::<HashSet<_>>()
            .len()
    }
}
