//! Request instrumentation middleware.
//!
//! Wraps every inbound request end-to-end: opens the root span, keeps it
//! current for the whole handler execution (nested spans and logs inherit
//! its trace id), then records exactly one counter increment and one
//! histogram observation with the final status before the span closes.
//!
//! The timeout and catch-panic layers sit inside this one, so a timed-out
//! or panicking handler still surfaces here as a plain response and takes
//! the same accounting path as a normal one.

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::http::server::AppState;
use crate::telemetry::metrics::record_request;
use crate::telemetry::SpanStatus;

pub async fn track_request(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().as_str().to_string();
    // The route template, not the raw path, so every /api/data request
    // shares one metric series.
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let start = Instant::now();

    let tracer = state.tracer.clone();
    tracer
        .scope(async move {
            let mut root = state.tracer.start_span(format!("{method} {endpoint}"));
            root.set_attribute("http.method", method.clone());
            root.set_attribute("http.route", endpoint.clone());

            let response = next.run(request).await;

            let status = response.status();
            root.set_attribute("http.status_code", u64::from(status.as_u16()));
            if status.is_server_error() {
                root.set_status(SpanStatus::Error {
                    message: format!("http status {}", status.as_u16()),
                });
            }

            let elapsed = start.elapsed();
            record_request(&method, &endpoint, status.as_u16(), elapsed);
            tracing::info!(
                request_id = %request_id,
                method = %method,
                endpoint = %endpoint,
                status = status.as_u16(),
                elapsed_ms = elapsed.as_millis() as u64,
                "request completed"
            );

            response
        })
        .await
}
