//! Square Candy Log Analyzer
//!
//! Analyzes nginx/apache access logs for per-site traffic patterns across
//! several hosting-platform conventions and exposes the aggregated metrics
//! in Prometheus text exposition format over HTTP.
//!
//! # Overview
//!
//! Hosting platforms (Plesk, GridPane, generic Ubuntu) store access logs
//! under different paths and write structurally different line layouts. A
//! collection pass walks every discovered domain, parses its logs with a
//! tolerant two-phase tokenizer, keeps the lines inside a trailing time
//! window, and aggregates per-domain totals, per-minute rates, bounded
//! top-N frequency tables and a status-code histogram.
//!
//! # Architecture
//!
//! - [`parser`]: tolerant multi-format log-line parser
//! - [`window`]: sliding time-window filter, validated at construction
//! - [`aggregate`]: per-domain summaries and top-N frequency tables
//! - [`exposition`]: deterministic Prometheus text encoder
//! - [`platform`]: per-platform domain and log-source discovery
//! - [`collector`]: the collection driver tying the above together
//! - [`cache`]: rendered-text buffer for background-refresh mode
//! - [`metrics_endpoint`]: the HTTP server scrapers talk to
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sqcdy_log_analyzer::{AnalysisWindow, Collector};
//! use sqcdy_log_analyzer::platform::{self, PlatformKind};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let platform = platform::build(PlatformKind::GridPane, None, None);
//! let window = AnalysisWindow::new(15)?;
//! let collector = Collector::new(platform, window, "host1".to_string());
//! print!("{}", collector.collect()?);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod cache;
pub mod collector;
pub mod config;
pub mod error;
pub mod exposition;
pub mod metrics_endpoint;
pub mod models;
pub mod parser;
pub mod platform;
pub mod source;
pub mod window;

// Re-export commonly used types
pub use aggregate::{FrequencyTable, SiteMetrics};
pub use cache::MetricsCache;
pub use collector::Collector;
pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, Result};
pub use metrics_endpoint::MetricsEndpoint;
pub use models::LogRecord;
pub use parser::PlatformHint;
pub use platform::{Platform, PlatformKind};
pub use source::LogSource;
pub use window::AnalysisWindow;
