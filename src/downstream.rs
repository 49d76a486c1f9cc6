//! Outbound call to the downstream dependency.
//!
//! GET /api/data performs one call against an external service. The call is
//! bounded by a per-request timeout and never retried; any failure is
//! normalized into [`DownstreamError`] for the handler to map to a 503.

use std::time::Duration;

use thiserror::Error;

use crate::config::DownstreamConfig;
use crate::telemetry::Tracer;

#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
}

/// Client for the downstream dependency.
#[derive(Clone)]
pub struct DownstreamClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl DownstreamClient {
    pub fn new(client: reqwest::Client, config: &DownstreamConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Call the dependency once, under its own child span.
    ///
    /// Returns the upstream status code on success. Timeouts surface as
    /// [`DownstreamError::Transport`] like any other connection failure.
    pub async fn fetch(&self, tracer: &Tracer) -> Result<u16, DownstreamError> {
        let mut span = tracer.start_span("downstream-call");
        span.set_attribute("http.url", self.url.clone());
        tracing::info!(url = %self.url, "calling downstream service");

        let response = match self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let err = DownstreamError::Transport(e.to_string());
                span.record_exception(&err);
                return Err(err);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let err = DownstreamError::Status(status.as_u16());
            span.record_exception(&err);
            return Err(err);
        }

        span.set_attribute("http.status_code", u64::from(status.as_u16()));
        Ok(status.as_u16())
    }
}
