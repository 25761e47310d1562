//! Sliding time-window filter

use crate::error::{AnalyzerError, Result};
use chrono::{Duration, NaiveDateTime};

/// The trailing interval over which log lines are eligible for counting
///
/// The window has an inclusive lower bound and no upper bound: future-dated
/// entries are accepted, since log rotation boundaries are not clock
/// synchronized with the collector. A zero-length window is rejected at
/// construction so the per-minute rate division downstream can never divide
/// by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindow {
    minutes: u32,
}

impl AnalysisWindow {
    /// Create a window of `minutes` trailing minutes
    ///
    /// # Returns
    /// * `Ok(AnalysisWindow)` when `minutes > 0`
    /// * `Err(AnalyzerError::ConfigError)` otherwise
    pub fn new(minutes: u32) -> Result<Self> {
        if minutes == 0 {
            return Err(AnalyzerError::ConfigError(
                "analysis window must be at least 1 minute".to_string(),
            ));
        }
        Ok(AnalysisWindow { minutes })
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Oldest timestamp still inside the window relative to `now`
    pub fn cutoff(&self, now: NaiveDateTime) -> NaiveDateTime {
        now - Duration::minutes(i64::from(self.minutes))
    }

    /// Whether `ts` falls inside the window ending at `now`
    pub fn contains(&self, ts: NaiveDateTime, now: NaiveDateTime) -> bool {
        ts >= self.cutoff(now)
    }
}
