//! Bounded backward calendar-day iterator
//!
//! The incremental scan walks from today toward the past one day at a
//! time. On a sparse or empty store that walk must not run unbounded, so
//! the iterator yields at most a fixed number of days; the ceiling is an
//! explicit parameter rather than loop logic.

use chrono::NaiveDate;

/// Hard ceiling on backward day stepping: five years.
pub const MAX_LOOKBACK_DAYS: u32 = 365 * 5;

/// Yields calendar days newest-first, starting at `start`, for at most
/// `max_days` days.
#[derive(Debug, Clone)]
pub struct DaysBack {
    next: Option<NaiveDate>,
    remaining: u32,
}

impl DaysBack {
    pub fn new(start: NaiveDate, max_days: u32) -> Self {
        Self {
            next: Some(start),
            remaining: max_days,
        }
    }
}

impl Iterator for DaysBack {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let current = self.next?;
        self.next = current.pred_opt();
        Some(current)
    }
}
