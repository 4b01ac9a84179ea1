//! The periodic flush cycle: buffer to aggregated, merged, persisted snapshots.
//!
//! A flush works on a copy of the buffer taken under the state lock, so
//! observations keep appending while snapshots are merged and written. Only
//! records whose date was persisted (or was found to carry nothing) are
//! removed afterwards; records of a date whose write failed stay buffered
//! for the next cycle.
//!
//! Flushes must not overlap. The main loop runs them one at a time.

use std::collections::HashSet;

use tokio::sync::Mutex;
use tracing::{error, info};

use crate::persistence::{SnapshotStore, StoreError};
use crate::stats::{aggregate, merge_and_persist, partition_by_date, MergeOutcome};
use crate::summary::{summarize, NO_CHANGES_SUMMARY};
use crate::trackers::ActivityState;

/// Result of one flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// One-line human summary of the flushed records.
    pub summary: String,
    /// Date keys whose snapshot was written.
    pub persisted: Vec<String>,
    /// Date keys whose merged snapshot was empty and not written.
    pub skipped_empty: Vec<String>,
    /// Number of records removed from the buffer.
    pub records_flushed: usize,
    /// Active minutes released from the session accumulator.
    pub minutes_flushed: u64,
}

impl FlushReport {
    fn nothing() -> Self {
        Self {
            summary: NO_CHANGES_SUMMARY.to_string(),
            persisted: Vec::new(),
            skipped_empty: Vec::new(),
            records_flushed: 0,
            minutes_flushed: 0,
        }
    }
}

/// Aggregates the buffer, merges it into `store` and releases what was written.
///
/// # Errors
///
/// Returns the first [`StoreError`]. Dates processed before the failure are
/// still released from the buffer; the failed date and any after it are not.
pub async fn flush<S>(state: &Mutex<ActivityState>, store: &S) -> Result<FlushReport, StoreError>
where
    S: SnapshotStore + ?Sized,
{
    let records = state.lock().await.buffer.clone();
    if records.is_empty() {
        return Ok(FlushReport::nothing());
    }

    let mut report = FlushReport::nothing();
    report.summary = summarize(&records);

    let mut released = HashSet::new();
    let mut failure = None;

    for (date, group) in partition_by_date(&records) {
        let fresh = aggregate(&group, date);
        match merge_and_persist(store, &fresh) {
            Ok(outcome) => {
                match outcome {
                    MergeOutcome::Persisted(_) => report.persisted.push(fresh.date),
                    MergeOutcome::SkippedEmpty => report.skipped_empty.push(fresh.date),
                }
                report.records_flushed += group.len();
                report.minutes_flushed += group.iter().map(|r| u64::from(r.duration_minutes)).sum::<u64>();
                released.insert(date);
            }
            Err(e) => {
                error!(date = %fresh.date, error = %e, "Flush failed, keeping records buffered");
                failure = Some(e);
                break;
            }
        }
    }

    {
        let mut state = state.lock().await;
        // Records appended during the flush sit after the copied prefix.
        let split = records.len().min(state.buffer.len());
        let arrived = state.buffer.split_off(split);
        state.buffer.retain(|r| !released.contains(&r.date()));
        state.buffer.extend(arrived);
        state.clock.release(report.minutes_flushed);
    }

    if let Some(e) = failure {
        return Err(e);
    }

    info!(
        records = report.records_flushed,
        minutes = report.minutes_flushed,
        summary = %report.summary,
        "Flush complete"
    );
    Ok(report)
}
