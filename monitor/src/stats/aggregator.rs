//! Folding buffered change records into a [`PeriodSnapshot`].
//!
//! Aggregation is pure: the same records always yield the same snapshot.
//! Every insertion-ordered map in the result reflects the order in which
//! records were seen, and the derived top-N lists break ties by that order.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use codetrack_monitor::stats::aggregate;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! let snapshot = aggregate(&[], date);
//!
//! assert_eq!(snapshot.date, "2024-03-01");
//! assert!(snapshot.is_empty());
//! ```

use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::types::{ChangeRecord, PeriodSnapshot, ProjectStats};

/// Length of every derived top-N list.
pub const TOP_N: usize = 5;

/// Returns the keys with the largest values, at most `n` of them.
///
/// Ordering is descending by value; equal values keep their input order.
pub fn top_n<K, I>(entries: I, n: usize) -> Vec<K>
where
    I: IntoIterator<Item = (K, u64)>,
{
    let mut entries: Vec<(K, u64)> = entries.into_iter().collect();
    // sort_by is stable
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.into_iter().take(n).map(|(k, _)| k).collect()
}

impl ProjectStats {
    /// Adds one record to the counters, maps and file list.
    ///
    /// Derived fields are left stale; call
    /// [`recompute_derived`](Self::recompute_derived) afterwards.
    pub fn absorb(&mut self, record: &ChangeRecord) {
        let minutes = u64::from(record.duration_minutes);

        self.total_lines_added += u64::from(record.lines_added);
        self.total_lines_removed += u64::from(record.lines_removed);
        self.total_active_time += minutes;

        *self.language_stats.entry(record.language()).or_insert(0) += minutes;
        *self.change_frequency.entry(record.hour()).or_insert(0) += minutes;

        self.files
            .entry(record.file_path.clone())
            .or_default()
            .push(record.clone());
    }

    /// Recomputes [`top_files`](Self::top_files) and
    /// [`average_change_size`](Self::average_change_size).
    pub fn recompute_derived(&mut self) {
        let changes = self.change_count();
        self.average_change_size = if changes == 0 {
            0.0
        } else {
            (self.total_lines_added + self.total_lines_removed) as f64 / changes as f64
        };

        self.top_files = top_n(
            self.files
                .iter()
                .map(|(path, records)| (path.clone(), records.len() as u64)),
            TOP_N,
        );
    }
}

impl PeriodSnapshot {
    /// Recomputes every derived field of the snapshot and its projects.
    pub fn recompute_summary(&mut self) {
        for project in self.projects.values_mut() {
            project.recompute_derived();
        }

        let mut hours: IndexMap<u8, u64> = IndexMap::new();
        let mut languages: IndexMap<String, u64> = IndexMap::new();
        for project in self.projects.values() {
            for (hour, minutes) in &project.change_frequency {
                *hours.entry(*hour).or_insert(0) += minutes;
            }
            for (language, minutes) in &project.language_stats {
                *languages.entry(language.clone()).or_insert(0) += minutes;
            }
        }

        self.total_active_time = self.projects.values().map(|p| p.total_active_time).sum();
        self.total_projects = self.projects.len();
        self.total_files = self.distinct_file_count();
        self.most_active_hours = top_n(hours, TOP_N);
        self.most_used_languages = top_n(languages, TOP_N);
    }
}

/// Builds a fresh snapshot for `date` from `records`.
///
/// An empty slice yields a snapshot with no projects.
#[must_use]
pub fn aggregate(records: &[ChangeRecord], date: NaiveDate) -> PeriodSnapshot {
    let mut snapshot = PeriodSnapshot::for_date(date);

    for record in records {
        snapshot
            .projects
            .entry(record.project_name.clone())
            .or_default()
            .absorb(record);
    }

    snapshot.recompute_summary();
    snapshot
}

/// Groups records by their local calendar date, in first-seen order.
#[must_use]
pub fn partition_by_date(records: &[ChangeRecord]) -> IndexMap<NaiveDate, Vec<ChangeRecord>> {
    let mut groups: IndexMap<NaiveDate, Vec<ChangeRecord>> = IndexMap::new();
    for record in records {
        groups.entry(record.date()).or_default().push(record.clone());
    }
    groups
}
