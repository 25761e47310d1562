//! Rendered-metrics cache for background-refresh mode
//!
//! In background-refresh mode a periodic task runs full collection passes
//! and swaps the rendered text in here; HTTP handlers only ever take the
//! read lock. The critical sections are a clone out and a pointer-sized
//! swap in, so readers never block a writer for longer than that.

use crate::collector::Collector;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Last rendered exposition text and when it was produced
#[derive(Debug, Clone)]
struct CachedRender {
    body: String,
    refreshed_at: Instant,
}

/// Shared rendered-text buffer, empty until the first refresh completes
#[derive(Debug, Default)]
pub struct MetricsCache {
    inner: RwLock<Option<CachedRender>>,
}

impl MetricsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the rendered text
    pub fn store(&self, body: String) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(CachedRender {
            body,
            refreshed_at: Instant::now(),
        });
    }

    /// Current rendered text, if any refresh has completed yet
    pub fn current(&self) -> Option<String> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map(|cached| cached.body.clone())
    }

    /// Time since the last successful refresh
    pub fn age(&self) -> Option<Duration> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map(|cached| cached.refreshed_at.elapsed())
    }
}

/// Spawn the periodic refresh task
///
/// Each tick runs a full collection pass on the blocking pool and swaps the
/// result in. A failed pass keeps the previous buffer; the next tick is a
/// clean retry.
pub fn spawn_refresh(
    cache: Arc<MetricsCache>,
    collector: Arc<Collector>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            info!("background collection starting");
            let worker = Arc::clone(&collector);
            match tokio::task::spawn_blocking(move || worker.collect()).await {
                Ok(Ok(body)) => {
                    cache.store(body);
                    info!("background collection complete");
                }
                Ok(Err(e)) => error!("background collection failed: {e}"),
                Err(e) => error!("background collection panicked: {e}"),
            }
            tokio::time::sleep(interval).await;
        }
    })
}
