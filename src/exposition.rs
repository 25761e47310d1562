//! Prometheus text exposition encoder
//!
//! Renders the full per-domain snapshot into the text format scraped by a
//! pull-based collector. Output is deterministic: domains iterate in
//! lexicographic order, each metric name gets exactly one HELP/TYPE header
//! pair before its first value line, counters render without a decimal
//! point and rates with exactly two decimals. Rendering the same snapshot
//! twice yields byte-identical text.

use crate::aggregate::{
    SiteMetrics, TOP_IPS_LIMIT, TOP_URLS_LIMIT, TOP_USER_AGENTS_LIMIT,
};
use std::collections::BTreeMap;

/// Metric name prefix shared by every series this exporter emits
pub const METRIC_PREFIX: &str = "sqcdy";

/// Escape a label value for the exposition format
///
/// Backslash is escaped before quote; the reverse order would re-escape the
/// backslashes injected for the quotes.
pub fn escape_label_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// HELP/TYPE header pairs, one per metric name, emitted before any values
const HEADERS: &[(&str, &str, &str)] = &[
    ("site_requests_total", "Total HTTP requests in time window", "counter"),
    ("site_traffic_bytes", "Total traffic in bytes in time window", "counter"),
    ("site_requests_per_minute", "Requests per minute", "gauge"),
    ("site_bytes_per_minute", "Bytes per minute", "gauge"),
    ("site_top_ip_requests", "Requests from top IP addresses", "gauge"),
    ("site_top_user_agent_requests", "Requests from top user agents", "gauge"),
    ("site_top_url_requests", "Requests to top URLs", "gauge"),
    ("site_status_code_total", "Requests by status code", "counter"),
];

/// Render all per-domain summaries plus the trailing scrape metadata
///
/// `sites` is keyed by domain; the `BTreeMap` makes the lexicographic
/// iteration order structural rather than incidental.
pub fn render(
    sites: &BTreeMap<String, SiteMetrics>,
    instance: &str,
    window_minutes: u32,
) -> String {
    let mut out = String::new();

    for (name, help, kind) in HEADERS {
        out.push_str(&format!("# HELP {METRIC_PREFIX}_{name} {help}\n"));
        out.push_str(&format!("# TYPE {METRIC_PREFIX}_{name} {kind}\n"));
    }

    let instance = escape_label_value(instance);
    for (domain, metrics) in sites {
        let domain = escape_label_value(domain);
        let base = format!("instance=\"{instance}\",domain=\"{domain}\"");

        out.push_str(&format!(
            "{METRIC_PREFIX}_site_requests_total{{{base}}} {}\n",
            metrics.requests_total
        ));
        out.push_str(&format!(
            "{METRIC_PREFIX}_site_traffic_bytes{{{base}}} {}\n",
            metrics.bytes_total
        ));
        out.push_str(&format!(
            "{METRIC_PREFIX}_site_requests_per_minute{{{base}}} {:.2}\n",
            metrics.requests_per_minute
        ));
        out.push_str(&format!(
            "{METRIC_PREFIX}_site_bytes_per_minute{{{base}}} {:.2}\n",
            metrics.bytes_per_minute
        ));

        for (ip, count) in metrics.top_ips.top(TOP_IPS_LIMIT) {
            out.push_str(&format!(
                "{METRIC_PREFIX}_site_top_ip_requests{{{base},ip=\"{}\"}} {count}\n",
                escape_label_value(ip)
            ));
        }
        for (agent, count) in metrics.top_user_agents.top(TOP_USER_AGENTS_LIMIT) {
            out.push_str(&format!(
                "{METRIC_PREFIX}_site_top_user_agent_requests{{{base},user_agent=\"{}\"}} {count}\n",
                escape_label_value(agent)
            ));
        }
        for (url, count) in metrics.top_urls.top(TOP_URLS_LIMIT) {
            out.push_str(&format!(
                "{METRIC_PREFIX}_site_top_url_requests{{{base},url=\"{}\"}} {count}\n",
                escape_label_value(url)
            ));
        }
        for (status, count) in &metrics.status_codes {
            out.push_str(&format!(
                "{METRIC_PREFIX}_site_status_code_total{{{base},status=\"{}\"}} {count}\n",
                escape_label_value(status)
            ));
        }
    }

    out.push_str(&format!(
        "# HELP {METRIC_PREFIX}_log_analysis_window_minutes Analysis time window in minutes\n"
    ));
    out.push_str(&format!(
        "# TYPE {METRIC_PREFIX}_log_analysis_window_minutes gauge\n"
    ));
    out.push_str(&format!(
        "{METRIC_PREFIX}_log_analysis_window_minutes {window_minutes}\n"
    ));
    out.push_str(&format!(
        "# HELP {METRIC_PREFIX}_sites_with_logs_total Number of sites with readable logs\n"
    ));
    out.push_str(&format!(
        "# TYPE {METRIC_PREFIX}_sites_with_logs_total gauge\n"
    ));
    out.push_str(&format!("{METRIC_PREFIX}_sites_with_logs_total {}\n", sites.len()));

    out
}
