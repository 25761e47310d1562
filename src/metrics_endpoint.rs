//! Metrics HTTP endpoint
//!
//! Serves the Prometheus exposition text over HTTP. `GET /metrics` is the
//! only route; every other path is a 404. A failed collection pass answers
//! the current scrape with a 500 and a one-line diagnostic, never a
//! backtrace, and the next scrape retries from scratch.

use crate::cache::MetricsCache;
use crate::collector::Collector;
use crate::error::{AnalyzerError, Result};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Metrics endpoint server
///
/// In synchronous mode (`cache` is `None`) every scrape runs a full
/// collection pass inline on the blocking pool. With a cache attached,
/// scrapes read the last rendered buffer and only the very first scrape
/// before any refresh falls back to an inline pass.
pub struct MetricsEndpoint {
    collector: Arc<Collector>,
    cache: Option<Arc<MetricsCache>>,
    addr: SocketAddr,
}

impl MetricsEndpoint {
    pub fn new(
        collector: Arc<Collector>,
        cache: Option<Arc<MetricsCache>>,
        addr: SocketAddr,
    ) -> Self {
        Self {
            collector,
            cache,
            addr,
        }
    }

    /// Start the endpoint server
    ///
    /// Listens on the configured address and serves until the process is
    /// terminated.
    pub async fn start(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("metrics endpoint listening on http://{}", self.addr);
        info!("metrics available at http://{}/metrics", self.addr);

        loop {
            let (stream, _) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let collector = Arc::clone(&self.collector);
            let cache = self.cache.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let collector = Arc::clone(&collector);
                    let cache = cache.clone();
                    async move { handle_request(req, collector, cache).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("error serving connection: {err:?}");
                }
            });
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    collector: Arc<Collector>,
    cache: Option<Arc<MetricsCache>>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    match req.uri().path() {
        "/metrics" => Ok(metrics_response(collector, cache).await),
        _ => Ok(not_found_response()),
    }
}

/// Produce the exposition body, from cache when possible
async fn metrics_response(
    collector: Arc<Collector>,
    cache: Option<Arc<MetricsCache>>,
) -> Response<Full<Bytes>> {
    if let Some(cache) = &cache {
        if let Some(body) = cache.current() {
            return exposition_response(body);
        }
    }

    // First scrape before any refresh, or synchronous-per-request mode:
    // run the pass inline, blocking this request until it finishes.
    match run_collection(collector).await {
        Ok(body) => {
            if let Some(cache) = &cache {
                cache.store(body.clone());
            }
            exposition_response(body)
        }
        Err(e) => {
            error!("collection failed: {e}");
            internal_error_response(&format!("error collecting metrics: {e}"))
        }
    }
}

/// Run one collection pass on the blocking pool
async fn run_collection(collector: Arc<Collector>) -> Result<String> {
    tokio::task::spawn_blocking(move || collector.collect())
        .await
        .map_err(|e| AnalyzerError::CollectionError(format!("collection task failed: {e}")))?
}

fn exposition_response(body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn internal_error_response(message: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from(format!("{message}\n"))))
        .unwrap()
}

fn not_found_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("404 Not Found")))
        .unwrap()
}
