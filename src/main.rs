use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use beacon::config::{load_config, AppConfig};
use beacon::http::AppServer;
use beacon::lifecycle::{shutdown_signal, Shutdown};
use beacon::telemetry::export::{self, ExporterSettings};
use beacon::telemetry::{logging, metrics, Tracer};
use beacon::workload::RandomPolicy;

#[derive(Parser)]
#[command(name = "beacon")]
#[command(about = "Instrumented request service demonstrating trace/metric/log correlation", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init(&config.service.name, &config.observability.log_level);

    tracing::info!(
        service = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        exporter_endpoint = %config.exporter.endpoint,
        "beacon starting"
    );

    let metrics_handle = metrics::install_recorder()?;
    let shutdown = Shutdown::new();

    let (tracer, exporter_task) = if config.exporter.enabled {
        let settings = ExporterSettings::from_config(&config);
        let (sink, task) = export::spawn(settings, metrics_handle.clone(), shutdown.subscribe());
        (Tracer::new(sink), Some(task))
    } else {
        (Tracer::disabled(), None)
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "listening for connections");

    let policy = Arc::new(RandomPolicy::new(config.workload.clone()));
    let server = AppServer::new(config, local_addr, policy, tracer, metrics_handle);

    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    // Give the exporter a moment to flush its final batch.
    if let Some(task) = exporter_task {
        let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
