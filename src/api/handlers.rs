//! Route handlers.
//!
//! Handlers run inside the root span the instrumentation middleware opened,
//! so every nested span and log here inherits the request's trace id.

use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::api::error::ApiError;
use crate::http::server::AppState;
use crate::telemetry::metrics::EXPOSITION_CONTENT_TYPE;
use crate::workload;

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: &'static str,
    pub message: &'static str,
    pub simulated_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub data: &'static str,
    pub source: String,
    pub rows: u32,
}

#[derive(Debug, Serialize)]
pub struct WriteResponse {
    pub message: &'static str,
    pub input: Value,
    pub rows: u32,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CallOutcome {
    pub call: usize,
    pub ok: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct LoadTestReport {
    pub calls: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<CallOutcome>,
}

/// GET /: service descriptor behind one simulated unit of work.
pub async fn home(State(state): State<AppState>) -> Json<ServiceInfo> {
    let outcome = workload::home_work(&state.tracer, state.policy.as_ref()).await;

    Json(ServiceInfo {
        service: state.config.service.name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        message: "hello from beacon",
        simulated_ms: outcome.elapsed.as_millis() as u64,
    })
}

/// GET /api/data: database query simulation plus one downstream call.
pub async fn get_data(State(state): State<AppState>) -> Result<Json<DataResponse>, ApiError> {
    let mut span = state.tracer.start_span("data-operation");
    span.set_attribute("http.method", "GET");
    tracing::info!(method = "GET", "received request for /api/data");

    let query = workload::database_query(&state.tracer, state.policy.as_ref()).await?;

    match state.downstream.fetch(&state.tracer).await {
        Ok(status) => {
            span.set_attribute("external.service.status", u64::from(status));
        }
        Err(e) => {
            span.record_exception(&e);
            tracing::error!(error = %e, "error calling external service");
            return Err(ApiError::Downstream(e.to_string()));
        }
    }

    tracing::info!(rows = query.rows, "serving data for GET /api/data");
    Ok(Json(DataResponse {
        data: "sample data",
        source: state.config.service.name.clone(),
        rows: query.rows,
    }))
}

/// POST /api/data: write simulation with its own independent error
/// injection on top of the database query's.
pub async fn post_data(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<WriteResponse>), ApiError> {
    let mut span = state.tracer.start_span("data-operation");
    span.set_attribute("http.method", "POST");
    tracing::info!(method = "POST", "received request for /api/data");

    let query = workload::database_query(&state.tracer, state.policy.as_ref()).await?;

    if state.policy.inject_write_failure() {
        let err = ApiError::Simulated("simulated internal server error".to_string());
        span.record_exception(&err);
        tracing::error!("simulated error handling POST /api/data");
        return Err(err);
    }

    let input = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };

    tracing::info!(rows = query.rows, "processed POST data");
    Ok((
        StatusCode::CREATED,
        Json(WriteResponse {
            message: "data processed successfully",
            input,
            rows: query.rows,
        }),
    ))
}

/// GET /health: static healthy descriptor; no error injection.
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let _span = state.tracer.start_span("health-check");
    tracing::debug!("health probe");

    Json(HealthStatus {
        status: "healthy",
        service: state.config.service.name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /metrics: Prometheus exposition snapshot.
pub async fn metrics_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.metrics.render(),
    )
}

/// GET /load-test: N sequential internal calls against /api/data.
///
/// Each call has its own deadline; a failed or timed-out call is recorded
/// in the report and the loop carries on, so the result list always has
/// exactly `calls` entries.
pub async fn load_test(State(state): State<AppState>) -> Json<LoadTestReport> {
    let mut span = state.tracer.start_span("load-test");
    let calls = state.config.load_test.calls;
    let timeout = Duration::from_millis(state.config.load_test.call_timeout_ms);
    let url = format!("{}/api/data", state.self_base);
    span.set_attribute("load_test.calls", calls as u64);
    tracing::info!(calls, url = %url, "starting load test");

    let mut results = Vec::with_capacity(calls);
    for call in 1..=calls {
        let started = Instant::now();
        let outcome = match state.http_client.get(&url).timeout(timeout).send().await {
            Ok(response) => {
                let status = response.status();
                CallOutcome {
                    call,
                    ok: status.is_success(),
                    status: Some(status.as_u16()),
                    error: (!status.is_success()).then(|| format!("unexpected status {}", status.as_u16())),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                }
            }
            Err(e) => {
                tracing::warn!(call, error = %e, "load-test call failed");
                CallOutcome {
                    call,
                    ok: false,
                    status: None,
                    error: Some(e.to_string()),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                }
            }
        };
        results.push(outcome);
    }

    let succeeded = results.iter().filter(|r| r.ok).count();
    let failed = calls - succeeded;
    span.set_attribute("load_test.succeeded", succeeded as u64);
    span.set_attribute("load_test.failed", failed as u64);
    if failed > 0 {
        tracing::warn!(succeeded, failed, "load test finished with failures");
    } else {
        tracing::info!(succeeded, "load test finished");
    }

    Json(LoadTestReport {
        calls,
        succeeded,
        failed,
        results,
    })
}
