//! Integration tests for the metrics HTTP endpoint

use sqcdy_log_analyzer::platform::GridPanePlatform;
use sqcdy_log_analyzer::{AnalysisWindow, Collector, MetricsCache, MetricsEndpoint};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn test_collector(dir: &std::path::Path) -> Arc<Collector> {
    Arc::new(Collector::new(
        Arc::new(GridPanePlatform::new(dir)),
        AnalysisWindow::new(15).unwrap(),
        "testhost".to_string(),
    ))
}

/// Reserve a local port for the endpoint under test
fn free_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

async fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

#[tokio::test]
async fn test_endpoint_starts() {
    let dir = tempfile::tempdir().unwrap();
    let endpoint = MetricsEndpoint::new(test_collector(dir.path()), None, free_port());

    let handle = tokio::spawn(async move { endpoint.start().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.abort();
}

#[tokio::test]
async fn test_metrics_path_serves_exposition() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("example.com.access.log"),
        "[01/Jan/2026:00:05:00 +0000] 10.0.0.1 - - - \"GET / HTTP/1.1\" 200 10 0.001 \"-\" \"curl/8.0\"\n",
    )
    .unwrap();

    let addr = free_port();
    let endpoint = MetricsEndpoint::new(test_collector(dir.path()), None, addr);
    let handle = tokio::spawn(async move { endpoint.start().await });
    tokio::time::sleep(Duration::from_millis(200)).await;

    let response = get(addr, "/metrics").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("text/plain; version=0.0.4"));
    assert!(response.contains("# HELP sqcdy_site_requests_total"));
    assert!(response.contains("sqcdy_log_analysis_window_minutes 15"));

    handle.abort();
}

#[tokio::test]
async fn test_other_paths_are_404() {
    let dir = tempfile::tempdir().unwrap();
    let addr = free_port();
    let endpoint = MetricsEndpoint::new(test_collector(dir.path()), None, addr);
    let handle = tokio::spawn(async move { endpoint.start().await });
    tokio::time::sleep(Duration::from_millis(200)).await;

    for path in ["/", "/health", "/metrics/extra"] {
        let response = get(addr, path).await;
        assert!(
            response.starts_with("HTTP/1.1 404"),
            "expected 404 for {path}"
        );
    }

    handle.abort();
}

#[tokio::test]
async fn test_cached_mode_serves_stored_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(MetricsCache::new());
    cache.store("cached exposition body\n".to_string());

    let addr = free_port();
    let endpoint = MetricsEndpoint::new(test_collector(dir.path()), Some(cache), addr);
    let handle = tokio::spawn(async move { endpoint.start().await });
    tokio::time::sleep(Duration::from_millis(200)).await;

    let response = get(addr, "/metrics").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("cached exposition body"));

    handle.abort();
}

#[tokio::test]
async fn test_cached_mode_falls_back_before_first_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(MetricsCache::new());

    let addr = free_port();
    let endpoint = MetricsEndpoint::new(
        test_collector(dir.path()),
        Some(Arc::clone(&cache)),
        addr,
    );
    let handle = tokio::spawn(async move { endpoint.start().await });
    tokio::time::sleep(Duration::from_millis(200)).await;

    // no refresh has run yet; the scrape collects synchronously and
    // populates the cache for the next reader
    let response = get(addr, "/metrics").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("sqcdy_sites_with_logs_total 0"));
    assert!(cache.current().is_some());

    handle.abort();
}
