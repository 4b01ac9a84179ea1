//! Reading the snapshots of a calendar-date range.

use chrono::NaiveDate;
use tracing::warn;

use crate::persistence::SnapshotStore;
use crate::types::{date_key, PeriodSnapshot};

/// Returns the stored snapshots for every date in `start..=end`.
///
/// One lookup is made per calendar date. Dates without a snapshot are
/// skipped, as are dates whose lookup fails (with a warning). The result is
/// sorted ascending by date. A reversed range yields nothing.
pub fn read_range<S>(store: &S, start: NaiveDate, end: NaiveDate) -> Vec<PeriodSnapshot>
where
    S: SnapshotStore + ?Sized,
{
    if start > end {
        warn!(%start, %end, "Range start is after its end");
        return Vec::new();
    }

    let mut snapshots: Vec<PeriodSnapshot> = start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter_map(|day| {
            let key = date_key(day);
            match store.get(&key) {
                Ok(found) => found,
                Err(e) => {
                    warn!(date = %key, error = %e, "Skipping unreadable snapshot");
                    None
                }
            }
        })
        .collect();

    snapshots.sort_by(|a, b| a.date.cmp(&b.date));
    snapshots
}
