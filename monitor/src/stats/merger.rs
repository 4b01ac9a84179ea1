//! Reconciling a fresh snapshot with the persisted one for the same date.
//!
//! # Merge Rules
//!
//! | Persisted entry | Result |
//! |-----------------|--------|
//! | none | the fresh snapshot |
//! | different `date` | the fresh snapshot, replacing it wholesale |
//! | same `date` | per-project merge (below) |
//!
//! For a project present in both, the three totals and every
//! `languageStats` / `changeFrequency` entry are summed, and each file's
//! records are concatenated persisted-first. A project only in the fresh
//! snapshot is copied in. Derived fields are then recomputed from the merged
//! data.
//!
//! A merged result that [`is_empty`](PeriodSnapshot::is_empty) is never
//! written.

use tracing::{debug, info};

use crate::persistence::{SnapshotStore, StoreError};
use crate::types::{PeriodSnapshot, ProjectStats};

/// What [`merge_and_persist`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The merged snapshot was written.
    Persisted(PeriodSnapshot),
    /// The merged snapshot carried no activity and was not written.
    SkippedEmpty,
}

/// Folds `fresh` into `existing`, which must be for the same project.
pub fn merge_project(existing: &mut ProjectStats, fresh: &ProjectStats) {
    existing.total_lines_added += fresh.total_lines_added;
    existing.total_lines_removed += fresh.total_lines_removed;
    existing.total_active_time += fresh.total_active_time;

    for (path, records) in &fresh.files {
        existing
            .files
            .entry(path.clone())
            .or_default()
            .extend(records.iter().cloned());
    }
    for (language, minutes) in &fresh.language_stats {
        *existing.language_stats.entry(language.clone()).or_insert(0) += minutes;
    }
    for (hour, minutes) in &fresh.change_frequency {
        *existing.change_frequency.entry(*hour).or_insert(0) += minutes;
    }
}

/// Merges `fresh` on top of `persisted` and returns the result.
///
/// Snapshots for different dates are not merged: `fresh` wins.
#[must_use]
pub fn merge_snapshots(persisted: Option<PeriodSnapshot>, fresh: &PeriodSnapshot) -> PeriodSnapshot {
    let mut merged = match persisted {
        Some(existing) if existing.date == fresh.date => existing,
        Some(existing) => {
            debug!(persisted = %existing.date, fresh = %fresh.date, "Replacing snapshot for a different date");
            return fresh.clone();
        }
        None => return fresh.clone(),
    };

    for (name, stats) in &fresh.projects {
        match merged.projects.get_mut(name) {
            Some(existing) => merge_project(existing, stats),
            None => {
                merged.projects.insert(name.clone(), stats.clone());
            }
        }
    }

    merged.recompute_summary();
    merged
}

/// Loads the persisted snapshot for `fresh.date`, merges and writes it back.
///
/// # Errors
///
/// Returns [`StoreError`] if the store cannot be read or written. The
/// caller's buffer is never touched here.
pub fn merge_and_persist<S>(store: &S, fresh: &PeriodSnapshot) -> Result<MergeOutcome, StoreError>
where
    S: SnapshotStore + ?Sized,
{
    let persisted = store.get(&fresh.date)?;
    let merged = merge_snapshots(persisted, fresh);

    if merged.is_empty() {
        debug!(date = %merged.date, "Nothing to persist");
        return Ok(MergeOutcome::SkippedEmpty);
    }

    store.put(&merged)?;
    info!(
        date = %merged.date,
        projects = merged.total_projects,
        files = merged.total_files,
        active_minutes = merged.total_active_time,
        "Snapshot persisted"
    );
    Ok(MergeOutcome::Persisted(merged))
}
