//! Human-readable summaries of captured activity.
//!
//! # Example
//!
//! ```
//! use codetrack_monitor::summary::{format_active_time, summarize};
//!
//! assert_eq!(summarize(&[]), "No changes in the last period.");
//! assert_eq!(format_active_time(135), "2h 15m");
//! ```

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::persistence::{SnapshotStore, StoreError};
use crate::types::{date_key, ChangeRecord};

/// Summary used when a flush had nothing to write.
pub const NO_CHANGES_SUMMARY: &str = "No changes in the last period.";

/// Builds the one-line summary of a batch of records.
#[must_use]
pub fn summarize(records: &[ChangeRecord]) -> String {
    if records.is_empty() {
        return NO_CHANGES_SUMMARY.to_string();
    }

    let files: HashSet<&str> = records.iter().map(|r| r.file_path.as_str()).collect();
    let projects: HashSet<&str> = records.iter().map(|r| r.project_name.as_str()).collect();
    let added: u64 = records.iter().map(|r| u64::from(r.lines_added)).sum();
    let removed: u64 = records.iter().map(|r| u64::from(r.lines_removed)).sum();
    let minutes: u64 = records.iter().map(|r| u64::from(r.duration_minutes)).sum();

    format!(
        "Changed {} files across {} projects. Added {added} lines, removed {removed} lines. \
         Active coding time: {minutes} {}.",
        files.len(),
        projects.len(),
        if minutes == 1 { "minute" } else { "minutes" },
    )
}

/// Formats minutes as `"{h}h {m}m"`, or `"{m}m"` below one hour.
#[must_use]
pub fn format_active_time(minutes: u64) -> String {
    let (hours, rest) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{hours}h {rest}m")
    } else {
        format!("{rest}m")
    }
}

/// Active minutes for `today`: what is persisted plus the unflushed session.
///
/// # Errors
///
/// Returns [`StoreError`] if today's snapshot cannot be read.
pub fn today_active_minutes<S>(store: &S, today: NaiveDate, session_minutes: u64) -> Result<u64, StoreError>
where
    S: SnapshotStore + ?Sized,
{
    let persisted = store
        .get(&date_key(today))?
        .map_or(0, |snapshot| snapshot.total_active_time);
    Ok(persisted + session_minutes)
}
