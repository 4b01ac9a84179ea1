//! Active-time accounting from the spacing of edits.
//!
//! Each observed change credits a few active minutes based on the gap since
//! the previous change. Short gaps are credited in full, rounded up to whole
//! minutes and capped; longer gaps are treated as idle time and credit
//! nothing.
//!
//! | Gap since previous change | Minutes credited |
//! |---------------------------|------------------|
//! | first change ever         | 0                |
//! | `<= 5 min`                | `min(5, ceil(gap))` |
//! | `> 5 min`                 | 0                |
//! | negative (late arrival)   | 0, last instant kept |
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, Local};
//! use codetrack_monitor::trackers::session_clock::SessionClock;
//!
//! let start = Local::now().fixed_offset();
//! let mut clock = SessionClock::new();
//!
//! assert_eq!(clock.accumulate(start), 0);
//! assert_eq!(clock.accumulate(start + Duration::seconds(90)), 2);
//! assert_eq!(clock.total_active_minutes(), 2);
//! ```

use chrono::{DateTime, FixedOffset};

/// Gaps longer than this count as idle time.
pub const IDLE_THRESHOLD_MS: i64 = 5 * 60 * 1000;

/// Upper bound on the minutes a single change can be credited.
pub const MAX_CONTRIBUTION_MINUTES: u32 = 5;

const MS_PER_MINUTE: i64 = 60 * 1000;

/// Returns the minutes credited for a gap of `gap_ms` milliseconds.
///
/// Negative gaps (a clock that stepped backwards) credit nothing.
#[must_use]
pub fn contribution_for_gap(gap_ms: i64) -> u32 {
    if !(0..=IDLE_THRESHOLD_MS).contains(&gap_ms) {
        return 0;
    }
    let minutes = (gap_ms + MS_PER_MINUTE - 1) / MS_PER_MINUTE;
    // bounded by IDLE_THRESHOLD_MS, fits in u32
    (minutes as u32).min(MAX_CONTRIBUTION_MINUTES)
}

/// Tracks the last activity instant and the minutes accumulated since the
/// last flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionClock {
    last_activity: Option<DateTime<FixedOffset>>,
    total_active_minutes: u64,
}

impl SessionClock {
    /// Creates a clock that has not seen any activity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records activity at `now` and returns the minutes it contributes.
    ///
    /// The last activity instant becomes `now`, even when the gap was idle.
    /// An instant earlier than the last activity contributes nothing and
    /// leaves the last activity where it was.
    pub fn accumulate(&mut self, now: DateTime<FixedOffset>) -> u32 {
        let minutes = match self.last_activity {
            None => 0,
            Some(last) if now < last => return 0,
            Some(last) => contribution_for_gap((now - last).num_milliseconds()),
        };
        self.last_activity = Some(now);
        self.total_active_minutes += u64::from(minutes);
        minutes
    }

    /// Minutes accumulated since the last reset.
    #[must_use]
    pub fn total_active_minutes(&self) -> u64 {
        self.total_active_minutes
    }

    /// Instant of the most recent activity, if any.
    #[must_use]
    pub fn last_activity(&self) -> Option<DateTime<FixedOffset>> {
        self.last_activity
    }

    /// Zeroes the accumulator.
    ///
    /// The last activity instant is kept: a flush is not an idle period, so
    /// the next change is still credited against the previous one.
    pub fn reset(&mut self) {
        self.total_active_minutes = 0;
    }

    /// Subtracts minutes that have been persisted by a flush.
    ///
    /// Minutes accumulated while the flush was running stay in the
    /// accumulator. With no concurrent activity this is the same as
    /// [`reset`](Self::reset).
    pub fn release(&mut self, minutes: u64) {
        self.total_active_minutes = self.total_active_minutes.saturating_sub(minutes);
    }
}
