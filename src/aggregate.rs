//! Per-domain aggregation engine
//!
//! One [`SiteMetrics`] exists per domain per collection pass and is rebuilt
//! from scratch every pass; there is no incremental merge across passes.
//! Accumulation is purely additive and never fails.

use crate::models::LogRecord;
use indexmap::IndexMap;

/// Entries exposed from the per-IP frequency table
pub const TOP_IPS_LIMIT: usize = 10;
/// Entries exposed from the per-user-agent frequency table
pub const TOP_USER_AGENTS_LIMIT: usize = 10;
/// Entries exposed from the per-URL frequency table
pub const TOP_URLS_LIMIT: usize = 20;

/// Bounded-output frequency table
///
/// The table itself grows without an explicit cap during accumulation (the
/// window filter and key truncation bound it in practice); cardinality is
/// only cut at output time by [`FrequencyTable::top`]. Backed by an
/// insertion-ordered map so that equal counts tie-break by first insertion,
/// which keeps repeated runs over the same input byte-identical.
#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    counts: IndexMap<String, u64>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment `key`, inserting it on first sight
    pub fn bump(&mut self, key: &str) {
        if let Some(count) = self.counts.get_mut(key) {
            *count += 1;
        } else {
            self.counts.insert(key.to_string(), 1);
        }
    }

    /// The `n` highest-count entries, count descending
    ///
    /// Ties keep first-insertion order: the sort is stable and the backing
    /// map iterates in insertion order.
    pub fn top(&self, n: usize) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .counts
            .iter()
            .map(|(key, count)| (key.as_str(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(n);
        entries
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Running traffic summary for one domain within one collection pass
#[derive(Debug, Clone, Default)]
pub struct SiteMetrics {
    pub requests_total: u64,
    pub bytes_total: u64,
    pub top_ips: FrequencyTable,
    pub top_user_agents: FrequencyTable,
    pub top_urls: FrequencyTable,
    /// Status string to count; unbounded, the status space is small
    pub status_codes: IndexMap<String, u64>,
    /// Derived at end of pass by [`SiteMetrics::finish`]
    pub requests_per_minute: f64,
    pub bytes_per_minute: f64,
}

impl SiteMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the summary
    ///
    /// Pure mutation, no I/O, never fails. A missing size contributes zero
    /// bytes; a missing user agent is not counted at all. The record's url
    /// and user agent were already truncated at parse time, so they are
    /// used as keys verbatim.
    pub fn accumulate(&mut self, record: &LogRecord) {
        self.requests_total += 1;
        self.bytes_total += record.size.unwrap_or(0);
        self.top_ips.bump(&record.source_ip);
        self.top_urls.bump(&record.url);
        if let Some(agent) = &record.user_agent {
            self.top_user_agents.bump(agent);
        }
        if let Some(count) = self.status_codes.get_mut(&record.status) {
            *count += 1;
        } else {
            self.status_codes.insert(record.status.clone(), 1);
        }
    }

    /// Compute the per-minute rates once the pass is complete
    ///
    /// Callers guarantee `window_minutes > 0`; the window type enforces it
    /// at construction.
    pub fn finish(&mut self, window_minutes: u32) {
        let minutes = f64::from(window_minutes);
        self.requests_per_minute = self.requests_total as f64 / minutes;
        self.bytes_per_minute = self.bytes_total as f64 / minutes;
    }
}
