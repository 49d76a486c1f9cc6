//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use beacon::config::AppConfig;
use beacon::http::AppServer;
use beacon::lifecycle::Shutdown;
use beacon::telemetry::{metrics, Tracer};
use beacon::workload::WorkPolicy;
use metrics_exporter_prometheus::PrometheusHandle;

static METRICS: OnceLock<PrometheusHandle> = OnceLock::new();

/// The global metrics recorder, installed once per test binary.
pub fn recorder_handle() -> PrometheusHandle {
    METRICS
        .get_or_init(|| metrics::install_recorder().expect("install metrics recorder"))
        .clone()
}

/// A config with instant, deterministic workload behavior and a small
/// load-test loop. Tests override individual fields as needed.
#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.exporter.enabled = false;
    config.workload.home_delay_ms = [0, 0];
    config.workload.db_delay_ms = [0, 0];
    config.workload.db_error_probability = 0.0;
    config.workload.slow_query_probability = 0.0;
    config.workload.write_error_probability = 0.0;
    config.load_test.calls = 3;
    config.load_test.call_timeout_ms = 1000;
    config
}

/// Start the service on an ephemeral port with a span-discarding tracer.
#[allow(dead_code)]
pub async fn spawn_app(config: AppConfig, policy: Arc<dyn WorkPolicy>) -> (SocketAddr, Shutdown) {
    spawn_app_with_tracer(config, policy, Tracer::disabled()).await
}

/// Start the service with a caller-supplied tracer, so tests can capture
/// the finished spans the request pipeline produces.
pub async fn spawn_app_with_tracer(
    mut config: AppConfig,
    policy: Arc<dyn WorkPolicy>,
    tracer: Tracer,
) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let server = AppServer::new(config, addr, policy, tracer, recorder_handle());
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Start a mock downstream service returning a fixed status and body.
#[allow(dead_code)]
pub async fn start_mock_downstream(status: u16, body: &'static str) -> SocketAddr {
    start_downstream_with_delay(status, body, Duration::ZERO).await
}

/// Start a mock downstream that waits before answering, to exercise
/// timeout paths.
#[allow(dead_code)]
pub async fn start_downstream_with_delay(
    status: u16,
    body: &'static str,
    delay: Duration,
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A URL on which nothing listens: the port is bound and released before
/// the address is handed out.
#[allow(dead_code)]
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

/// HTTP client that ignores environment proxies.
#[allow(dead_code)]
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
