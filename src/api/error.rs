//! Handler error type and its HTTP mapping.
//!
//! Every failure a handler can produce becomes a well-formed JSON error
//! response here; nothing escapes to the HTTP layer as an unhandled fault.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::workload::WorkError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Deliberately injected business failure.
    #[error("{0}")]
    Simulated(String),

    /// The downstream dependency failed or timed out.
    #[error("error calling external service: {0}")]
    Downstream(String),
}

impl From<WorkError> for ApiError {
    fn from(err: WorkError) -> Self {
        ApiError::Simulated(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Simulated(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Downstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_maps_to_500() {
        let response = ApiError::Simulated("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_downstream_maps_to_503() {
        let response = ApiError::Downstream("timed out".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
