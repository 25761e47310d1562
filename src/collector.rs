//! Collection driver
//!
//! One collection pass walks every domain the platform provider knows
//! about, streams each of its log sources line by line through the parser
//! and the window filter into a fresh per-domain summary, then renders the
//! whole snapshot. Passes are stateless: nothing survives from one pass to
//! the next, so every scrape or refresh tick is a clean retry.

use crate::aggregate::SiteMetrics;
use crate::error::Result;
use crate::exposition;
use crate::platform::Platform;
use crate::source::{read_lossy_line, LogSource};
use crate::window::AnalysisWindow;
use chrono::{Local, NaiveDateTime};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives parse → filter → accumulate → render over all domains
pub struct Collector {
    platform: Arc<dyn Platform>,
    window: AnalysisWindow,
    instance: String,
}

impl Collector {
    pub fn new(platform: Arc<dyn Platform>, window: AnalysisWindow, instance: String) -> Self {
        Collector {
            platform,
            window,
            instance,
        }
    }

    pub fn window(&self) -> AnalysisWindow {
        self.window
    }

    /// Run one full pass against the current wall clock
    pub fn collect(&self) -> Result<String> {
        // Log timestamps carry no normalized zone, so the cutoff is taken
        // from local time the same way the servers write the logs.
        self.collect_at(Local::now().naive_local())
    }

    /// Run one full pass with an explicit `now`, rendering the snapshot
    pub fn collect_at(&self, now: NaiveDateTime) -> Result<String> {
        let mut sites: BTreeMap<String, SiteMetrics> = BTreeMap::new();
        let domains = self.platform.enumerate_domains();
        info!(
            "collecting metrics for {} domains on {}",
            domains.len(),
            self.platform.kind()
        );

        for domain in domains {
            let sources = self.platform.list_log_sources(&domain);
            if sources.is_empty() {
                continue;
            }
            let metrics = self.analyze_domain(&domain, &sources, now);
            sites.insert(domain, metrics);
        }

        Ok(exposition::render(
            &sites,
            &self.instance,
            self.window.minutes(),
        ))
    }

    /// Aggregate all sources of one domain into a fresh summary
    ///
    /// A source that cannot be opened or that fails mid-read is logged and
    /// skipped; the domain and the pass continue. Lines matching no layout
    /// are tallied and dropped.
    fn analyze_domain(
        &self,
        domain: &str,
        sources: &[LogSource],
        now: NaiveDateTime,
    ) -> SiteMetrics {
        let hint = self.platform.parser_hint();
        let mut metrics = SiteMetrics::new();
        let mut unparsed: u64 = 0;

        for source in sources {
            let mut reader = match source.open() {
                Ok(reader) => reader,
                Err(e) => {
                    warn!("skipping {}: {e}", source.path().display());
                    continue;
                }
            };

            let mut buf = Vec::new();
            loop {
                match read_lossy_line(reader.as_mut(), &mut buf) {
                    Ok(Some(line)) => {
                        let Some(record) = crate::parser::parse(&line, hint) else {
                            unparsed += 1;
                            continue;
                        };
                        if !self.window.contains(record.timestamp, now) {
                            continue;
                        }
                        metrics.accumulate(&record);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("read error in {}: {e}", source.path().display());
                        break;
                    }
                }
            }
        }

        metrics.finish(self.window.minutes());
        if unparsed > 0 {
            debug!("{domain}: {unparsed} lines matched no known layout");
        }
        metrics
    }
}
