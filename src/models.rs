//! Core data models for the log analyzer

use chrono::NaiveDateTime;

/// Maximum number of characters of a URL kept as an aggregation key
pub const MAX_URL_LEN: usize = 200;

/// Maximum number of characters of a user agent kept as an aggregation key
pub const MAX_USER_AGENT_LEN: usize = 100;

/// One parsed access-log line
///
/// A record is ephemeral: it is produced by the parser, inspected by the
/// window filter, folded into a [`SiteMetrics`](crate::aggregate::SiteMetrics)
/// and dropped. `url` and `user_agent` are truncated before they are stored
/// here, so two distinct long values sharing a truncated prefix land in one
/// aggregation bucket. That is an intentional cardinality control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Request timestamp, second precision. Unparseable timestamps become
    /// [`NaiveDateTime::MIN`], which the window filter always rejects.
    pub timestamp: NaiveDateTime,
    /// Client address as it appeared in the log, not validated further
    pub source_ip: String,
    pub method: String,
    /// Request path, truncated to [`MAX_URL_LEN`] characters
    pub url: String,
    pub protocol: Option<String>,
    /// Status code kept as a string: it is a label, never arithmetic
    pub status: String,
    /// Response size in bytes; `None` when the field was `-` or malformed
    pub size: Option<u64>,
    pub referrer: Option<String>,
    /// User agent truncated to [`MAX_USER_AGENT_LEN`] characters; `None`
    /// when the field was empty or the literal `-`
    pub user_agent: Option<String>,
}

/// Truncate a string to at most `max` characters
///
/// Operates on char boundaries so multi-byte input never splits a code
/// point. Returns the input unchanged when it is short enough.
pub fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Normalize a quoted optional field: empty and `-` mean absent
pub fn optional_field(value: &str) -> Option<&str> {
    if value.is_empty() || value == "-" {
        None
    } else {
        Some(value)
    }
}
