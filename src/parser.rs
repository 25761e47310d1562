//! Tolerant multi-format access-log line parser
//!
//! Hosting platforms disagree about what goes between the client address
//! and the quoted request line: GridPane/Fortress nginx builds interleave an
//! optional response time, an optional cache status and an optional vhost
//! token (each possibly `-`), while stock nginx/apache put the timestamp
//! after the address instead of before it. At least eight distinct variants
//! show up in production logs, so enumerating rigid patterns is a losing
//! game.
//!
//! The parser instead works in two phases: it positionally extracts the
//! stable prefix (bracketed timestamp and client address, in either order),
//! then skips everything up to the first `"` wholesale. The skipped middle
//! tokens are not part of the aggregated model, so nothing is lost by
//! refusing to interpret them.

use crate::models::{
    optional_field, truncate_chars, LogRecord, MAX_URL_LEN, MAX_USER_AGENT_LEN,
};
use chrono::NaiveDateTime;

/// Timestamp layout inside the brackets, e.g. `02/Feb/2026:10:30:45 +0000`.
/// Only the date-time part is interpreted; the zone offset is read but not
/// applied (see DESIGN.md).
pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S";

/// Orders which line family is attempted first
///
/// GridPane logs lead with the bracketed timestamp; generic nginx/apache
/// logs lead with the client address. Both families are always tried, the
/// hint only decides the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlatformHint {
    GridPane,
    #[default]
    Generic,
}

/// Stable prefix of a line: timestamp text, client address, and the
/// remainder starting at the variable middle region.
struct Prefix<'a> {
    time: &'a str,
    ip: &'a str,
    rest: &'a str,
}

/// Outcome of looking for a quoted field at the head of a slice
enum Quoted<'a> {
    Absent,
    Unterminated,
    Field(&'a str, &'a str),
}

/// Parse one raw log line into a [`LogRecord`]
///
/// Returns `None` when the line matches no recognized layout: missing
/// bracketed timestamp, missing client address, no quoted request segment,
/// non-numeric status, or an unterminated quote. The function never panics
/// and never returns an error; unparsed lines are the caller's diagnostic
/// tally, not a failure.
pub fn parse(line: &str, hint: PlatformHint) -> Option<LogRecord> {
    let attempts: [fn(&str) -> Option<Prefix<'_>>; 2] = match hint {
        PlatformHint::GridPane => [bracket_first, ip_first],
        PlatformHint::Generic => [ip_first, bracket_first],
    };
    for extract in attempts {
        if let Some(prefix) = extract(line) {
            if let Some(record) = parse_tail(&prefix) {
                return Some(record);
            }
        }
    }
    None
}

/// Parse the bracketed timestamp text, falling back to the minimum
/// representable time
///
/// The sentinel guarantees exclusion by any window filter, so a line with a
/// mangled timestamp is silently dropped downstream rather than counted
/// into the wrong interval.
pub fn parse_timestamp(value: &str) -> NaiveDateTime {
    value
        .split_whitespace()
        .next()
        .and_then(|datetime| NaiveDateTime::parse_from_str(datetime, TIMESTAMP_FORMAT).ok())
        .unwrap_or(NaiveDateTime::MIN)
}

/// `[TIME] IP ...` — GridPane/Fortress family
fn bracket_first(line: &str) -> Option<Prefix<'_>> {
    let inner = line.trim_start().strip_prefix('[')?;
    let close = inner.find(']')?;
    let time = &inner[..close];
    let after = inner[close + 1..].trim_start();
    let ip_end = after.find(char::is_whitespace).unwrap_or(after.len());
    let ip = &after[..ip_end];
    if ip.is_empty() || ip.starts_with('"') {
        return None;
    }
    Some(Prefix {
        time,
        ip,
        rest: &after[ip_end..],
    })
}

/// `IP - USER [TIME] ...` — combined nginx/apache family
fn ip_first(line: &str) -> Option<Prefix<'_>> {
    let line = line.trim_start();
    if line.starts_with('[') {
        return None;
    }
    let ip_end = line.find(char::is_whitespace)?;
    let ip = &line[..ip_end];
    if ip.starts_with('"') {
        return None;
    }
    let after = &line[ip_end..];
    let open = after.find('[')?;
    // the timestamp bracket must precede the quoted request line, otherwise
    // a bracket inside a quoted field would be mistaken for it
    if let Some(quote) = after.find('"') {
        if quote < open {
            return None;
        }
    }
    let inner = &after[open + 1..];
    let close = inner.find(']')?;
    Some(Prefix {
        time: &inner[..close],
        ip,
        rest: &inner[close + 1..],
    })
}

/// Phase two: skip the variable middle region, then read the quoted request
/// line and the positional suffix.
fn parse_tail(prefix: &Prefix<'_>) -> Option<LogRecord> {
    // Everything between the address and the first quote is platform noise
    // (response time, cache status, vhost, auth user) and is discarded
    // without inspection.
    let quote = prefix.rest.find('"')?;
    let (request, rest) = match take_quoted(&prefix.rest[quote..]) {
        Quoted::Field(content, rest) => (content, rest),
        Quoted::Absent | Quoted::Unterminated => return None,
    };

    let mut request_parts = request.split_whitespace();
    let method = request_parts.next()?;
    let url = request_parts.next()?;
    let protocol = request_parts.next().map(str::to_string);

    let (status, rest) = next_token(rest)?;
    if !status.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // The size slot is positional but its value is best effort: `-` or a
    // mangled number contributes zero bytes, never a parse failure.
    let (size, rest) = match next_token(rest) {
        Some((token, rest)) => (token.parse::<u64>().ok(), rest),
        None => (None, rest),
    };

    // Some layouts repeat the response time after the size; skip at most
    // one such numeric token.
    let rest = match next_token(rest) {
        Some((token, after)) if is_numeric(token) => after,
        _ => rest,
    };

    let (referrer, user_agent) = match take_quoted(rest) {
        Quoted::Absent => (None, None),
        Quoted::Unterminated => return None,
        Quoted::Field(referrer, rest) => {
            let referrer = optional_field(referrer).map(str::to_string);
            match take_quoted(rest) {
                Quoted::Absent => (referrer, None),
                Quoted::Unterminated => return None,
                Quoted::Field(agent, _) => {
                    let agent = optional_field(truncate_chars(agent, MAX_USER_AGENT_LEN))
                        .map(str::to_string);
                    (referrer, agent)
                }
            }
        }
    };

    Some(LogRecord {
        timestamp: parse_timestamp(prefix.time),
        source_ip: prefix.ip.to_string(),
        method: method.to_string(),
        url: truncate_chars(url, MAX_URL_LEN).to_string(),
        protocol,
        status: status.to_string(),
        size,
        referrer,
        user_agent,
    })
}

/// Next whitespace-delimited token, stopping at a quoted field
fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() || s.starts_with('"') {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

/// Quoted field at the head of `s`, after leading whitespace
fn take_quoted(s: &str) -> Quoted<'_> {
    let s = s.trim_start();
    let Some(inner) = s.strip_prefix('"') else {
        return Quoted::Absent;
    };
    match inner.find('"') {
        Some(end) => Quoted::Field(&inner[..end], &inner[end + 1..]),
        None => Quoted::Unterminated,
    }
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty()
        && token.bytes().any(|b| b.is_ascii_digit())
        && token.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}
