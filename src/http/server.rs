//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request ID, instrumentation, timeout, panics)
//! - Serve with graceful shutdown

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::config::AppConfig;
use crate::downstream::DownstreamClient;
use crate::http::middleware::track_request;
use crate::http::request_id::UuidRequestId;
use crate::telemetry::Tracer;
use crate::workload::WorkPolicy;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tracer: Tracer,
    pub metrics: PrometheusHandle,
    pub downstream: DownstreamClient,
    pub http_client: reqwest::Client,
    pub policy: Arc<dyn WorkPolicy>,
    /// Base URL of this instance, used by the load-test loop's self-calls.
    pub self_base: String,
}

/// The instrumented HTTP server.
pub struct AppServer {
    router: Router,
}

impl AppServer {
    /// Build the server for a listener already bound at `local_addr`.
    pub fn new(
        config: AppConfig,
        local_addr: SocketAddr,
        policy: Arc<dyn WorkPolicy>,
        tracer: Tracer,
        metrics: PrometheusHandle,
    ) -> Self {
        let http_client = reqwest::Client::new();
        let downstream = DownstreamClient::new(http_client.clone(), &config.downstream);
        let request_timeout = Duration::from_secs(config.listener.request_timeout_secs);

        // A wildcard bind address is not connectable; self-calls go through
        // the loopback of the same family.
        let mut self_addr = local_addr;
        if self_addr.ip().is_unspecified() {
            self_addr.set_ip(match self_addr.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            });
        }

        let state = AppState {
            config: Arc::new(config),
            tracer,
            metrics,
            downstream,
            http_client,
            policy,
            self_base: format!("http://{self_addr}"),
        };

        let router = Router::new()
            .route("/", get(handlers::home))
            .route("/api/data", get(handlers::get_data).post(handlers::post_data))
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics_snapshot))
            .route("/load-test", get(handlers::load_test))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(middleware::from_fn_with_state(state.clone(), track_request))
                    .layer(TimeoutLayer::new(request_timeout))
                    .layer(CatchPanicLayer::new())
                    .layer(TraceLayer::new_for_http()),
            )
            .with_state(state);

        Self { router }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
