//! Background telemetry export.
//!
//! Finished spans arrive over a bounded queue and are shipped to the
//! collector in batches, either when the batch fills or on the flush
//! interval; metric snapshots ride along on the interval. The request path
//! only ever does a non-blocking enqueue, and every export failure is
//! logged at debug and dropped.

use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::AppConfig;
use crate::telemetry::span::SpanRecord;

/// Exporter settings extracted from the main configuration.
#[derive(Debug, Clone)]
pub struct ExporterSettings {
    pub service_name: String,
    pub endpoint: String,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub queue_size: usize,
}

impl ExporterSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            service_name: config.service.name.clone(),
            endpoint: config.exporter.endpoint.clone(),
            batch_size: config.exporter.batch_size,
            flush_interval: Duration::from_millis(config.exporter.flush_interval_ms),
            queue_size: config.exporter.queue_size,
        }
    }
}

/// Spawn the export worker.
///
/// Returns the span queue sender (handed to the tracer) and the worker's
/// join handle. The worker drains until the queue closes or shutdown fires,
/// then flushes once more.
pub fn spawn(
    settings: ExporterSettings,
    metrics: PrometheusHandle,
    mut shutdown: broadcast::Receiver<()>,
) -> (mpsc::Sender<SpanRecord>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<SpanRecord>(settings.queue_size);

    let handle = tokio::spawn(async move {
        let client = reqwest::Client::new();
        let traces_url = format!("http://{}/v1/traces", settings.endpoint);
        let metrics_url = format!("http://{}/v1/metrics", settings.endpoint);

        let mut batch: Vec<SpanRecord> = Vec::with_capacity(settings.batch_size);
        let mut ticker = tokio::time::interval(settings.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(record) => {
                        batch.push(record);
                        if batch.len() >= settings.batch_size {
                            flush_spans(&client, &traces_url, &settings.service_name, &mut batch).await;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    flush_spans(&client, &traces_url, &settings.service_name, &mut batch).await;
                    push_metrics(&client, &metrics_url, &metrics).await;
                }
                _ = shutdown.recv() => break,
            }
        }

        // Drain whatever is still queued before exiting.
        while let Ok(record) = rx.try_recv() {
            batch.push(record);
        }
        flush_spans(&client, &traces_url, &settings.service_name, &mut batch).await;
        tracing::debug!("telemetry exporter stopped");
    });

    (tx, handle)
}

async fn flush_spans(
    client: &reqwest::Client,
    url: &str,
    service_name: &str,
    batch: &mut Vec<SpanRecord>,
) {
    if batch.is_empty() {
        return;
    }

    let payload = serde_json::json!({
        "resource": { "service.name": service_name },
        "spans": &*batch,
    });

    match client.post(url).json(&payload).send().await {
        Ok(response) if !response.status().is_success() => {
            tracing::debug!(status = %response.status(), spans = batch.len(), "collector rejected span batch");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::debug!(error = %e, spans = batch.len(), "span export failed");
        }
    }
    batch.clear();
}

async fn push_metrics(client: &reqwest::Client, url: &str, metrics: &PrometheusHandle) {
    let snapshot = metrics.render();
    if snapshot.is_empty() {
        return;
    }

    if let Err(e) = client
        .post(url)
        .header(CONTENT_TYPE, crate::telemetry::metrics::EXPOSITION_CONTENT_TYPE)
        .body(snapshot)
        .send()
        .await
    {
        tracing::debug!(error = %e, "metrics export failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::span::{SpanRecord, TraceId};
    use metrics_exporter_prometheus::PrometheusBuilder;

    fn test_settings() -> ExporterSettings {
        ExporterSettings {
            service_name: "beacon-test".to_string(),
            // Nothing listens here; export failures must stay silent.
            endpoint: "127.0.0.1:59999".to_string(),
            batch_size: 4,
            flush_interval: Duration::from_millis(50),
            queue_size: 16,
        }
    }

    #[tokio::test]
    async fn test_worker_exits_on_shutdown() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let (shutdown, _keep) = broadcast::channel(1);
        let (tx, handle) = spawn(test_settings(), recorder.handle(), shutdown.subscribe());

        tx.try_send(SpanRecord::new("op", TraceId::generate(), None))
            .unwrap();
        shutdown.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_worker_exits_when_queue_closes() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let (shutdown, _keep) = broadcast::channel(1);
        let (tx, handle) = spawn(test_settings(), recorder.handle(), shutdown.subscribe());

        drop(tx);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
    }
}
