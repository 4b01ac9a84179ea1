//! Change capture: from a file notification to a buffered change record.
//!
//! - [`diff_extractor`]: line deltas from `git diff` or a line-count fallback
//! - [`session_clock`]: active minutes from the spacing of edits
//! - [`change_recorder`]: filtering, record construction, buffering

pub mod change_recorder;
pub mod diff_extractor;
pub mod session_clock;

pub use change_recorder::{ActivityState, ChangeRecorder, Observation, SkipReason};
pub use diff_extractor::{DiffExtractor, DiffResult, GitCli, LineCountOnly, VcsDiff};
pub use session_clock::SessionClock;
