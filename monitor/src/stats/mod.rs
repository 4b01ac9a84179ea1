//! Aggregation of change records and reconciliation with persisted snapshots.
//!
//! - [`aggregator`]: records to a fresh [`PeriodSnapshot`](crate::types::PeriodSnapshot)
//! - [`merger`]: fresh snapshot merged into the persisted one and written back

pub mod aggregator;
pub mod merger;

pub use aggregator::{aggregate, partition_by_date, top_n, TOP_N};
pub use merger::{merge_and_persist, merge_project, merge_snapshots, MergeOutcome};
