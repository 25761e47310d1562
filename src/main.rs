//! Square Candy Log Analyzer server
//!
//! Loads configuration, resolves the hosting platform, and either runs a
//! single collection pass (`--test`) or serves the metrics endpoint.

use anyhow::Context;
use clap::Parser;
use sqcdy_log_analyzer::platform::{self, PlatformKind};
use sqcdy_log_analyzer::{
    AnalysisWindow, AnalyzerConfig, Collector, MetricsCache, MetricsEndpoint,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "sqcdy-log-analyzer")]
#[command(about = "Per-site access log traffic metrics exporter", long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Port to listen on (default: 9103)
    #[arg(long)]
    port: Option<u16>,

    /// Analysis time window in minutes (default: 15)
    #[arg(long)]
    window: Option<u32>,

    /// Background refresh interval in seconds; 0 collects on every scrape
    #[arg(long)]
    refresh: Option<u64>,

    /// Platform kind (plesk, gridpane, ubuntu), bypassing detection
    #[arg(long)]
    platform: Option<String>,

    /// JSON output of the platform-detect probe
    #[arg(long, value_name = "FILE")]
    platform_info: Option<PathBuf>,

    /// Run one collection pass, print metrics to stdout and exit
    #[arg(long)]
    test: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match AnalyzerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("failed to load configuration: {e}");
                std::process::exit(1);
            }
        },
        None => AnalyzerConfig::default(),
    };

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(window) = args.window {
        config.window_minutes = window;
    }
    if let Some(refresh) = args.refresh {
        config.refresh_interval_secs = refresh;
    }
    if let Some(platform) = &args.platform {
        config.platform = Some(platform.clone());
    }
    if let Err(e) = config.validate() {
        error!("invalid configuration: {e}");
        std::process::exit(1);
    }

    let window = AnalysisWindow::new(config.window_minutes)
        .context("analysis window rejected at startup")?;

    let explicit_kind = match &config.platform {
        Some(name) => Some(name.parse::<PlatformKind>()?),
        None => None,
    };
    let platform = platform::resolve(
        explicit_kind,
        args.platform_info.as_deref(),
        config.log_path.clone(),
        config.site_path.clone(),
    )?;
    info!("platform: {}", platform.kind());
    info!("analyzing logs with {} minute window", window.minutes());

    let collector = Arc::new(Collector::new(
        platform,
        window,
        config.instance.clone(),
    ));

    if args.test {
        let metrics = collector.collect().context("collection pass failed")?;
        print!("{metrics}");
        return Ok(());
    }

    let cache = if config.refresh_interval_secs > 0 {
        let cache = Arc::new(MetricsCache::new());
        sqcdy_log_analyzer::cache::spawn_refresh(
            Arc::clone(&cache),
            Arc::clone(&collector),
            Duration::from_secs(config.refresh_interval_secs),
        );
        info!(
            "background refresh every {} seconds",
            config.refresh_interval_secs
        );
        Some(cache)
    } else {
        None
    };

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let endpoint = MetricsEndpoint::new(collector, cache, addr);
    endpoint.start().await.context("metrics endpoint failed")?;
    Ok(())
}
