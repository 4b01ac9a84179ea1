//! Read-side entry points behind the `status` and `report` commands.
//!
//! Both resolve the snapshot store from [`Config::from_env`], so they see the
//! same data directory as a running monitor.

use chrono::NaiveDate;

use crate::config::Config;
use crate::error::Result;
use crate::persistence::JsonFileStore;
use crate::range::read_range;
use crate::summary::{format_active_time, today_active_minutes};
use crate::types::PeriodSnapshot;

/// Today's persisted active time, formatted for the `status` command.
///
/// # Errors
///
/// Returns [`MonitorError::Config`](crate::MonitorError::Config) for invalid
/// configuration and [`MonitorError::Store`](crate::MonitorError::Store)
/// when today's snapshot cannot be read.
pub fn status_line(today: NaiveDate) -> Result<String> {
    let config = Config::from_env()?;
    let store = JsonFileStore::new(&config.data_dir);
    let minutes = today_active_minutes(&store, today, 0)?;
    Ok(format!("Today's coding time: {}", format_active_time(minutes)))
}

/// Stored snapshots for `start..=end` from the configured data directory.
///
/// # Errors
///
/// Returns [`MonitorError::Config`](crate::MonitorError::Config) for invalid
/// configuration. Unreadable days are skipped by [`read_range`].
pub fn load_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<PeriodSnapshot>> {
    let config = Config::from_env()?;
    let store = JsonFileStore::new(&config.data_dir);
    Ok(read_range(&store, start, end))
}

/// Pretty JSON array of `snapshots`, as printed by `report --json`.
///
/// # Errors
///
/// Returns [`MonitorError::Json`](crate::MonitorError::Json) if serialization
/// fails.
pub fn report_json(snapshots: &[PeriodSnapshot]) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshots)?)
}
