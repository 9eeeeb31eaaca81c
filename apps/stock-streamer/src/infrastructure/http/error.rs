//! HTTP error responses.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::application::services::PipelineError;
use crate::domain::quote::SymbolError;

/// JSON error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Stable error code.
    pub error: &'static str,
    /// Human-readable details.
    pub message: String,
    /// Whether retrying the same request later may succeed.
    pub retryable: bool,
}

/// Failure of a `/stock/{symbol}` request.
#[derive(Debug)]
pub enum ApiError {
    /// The path segment is not a valid ticker.
    InvalidSymbol(SymbolError),
    /// The pipeline failed.
    Pipeline(PipelineError),
}

impl ApiError {
    /// HTTP status for this failure.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidSymbol(_) => StatusCode::BAD_REQUEST,
            Self::Pipeline(e) => pipeline_status(e),
        }
    }

    /// Response body for this failure.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        match self {
            Self::InvalidSymbol(e) => ErrorBody {
                error: "invalid_symbol",
                message: e.to_string(),
                retryable: false,
            },
            Self::Pipeline(e) => ErrorBody {
                error: e.code(),
                message: e.to_string(),
                retryable: e.is_retryable(),
            },
        }
    }
}

const fn pipeline_status(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::SymbolNotFound { .. } => StatusCode::NOT_FOUND,
        PipelineError::MalformedUpstreamPayload { .. }
        | PipelineError::ImplausibleQuoteValue { .. }
        | PipelineError::BrokerRejected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PipelineError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
        PipelineError::BrokerUnavailable(_) | PipelineError::Cancelled { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        PipelineError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl From<SymbolError> for ApiError {
    fn from(error: SymbolError) -> Self {
        Self::InvalidSymbol(error)
    }
}

impl From<PipelineError> for ApiError {
    fn from(error: PipelineError) -> Self {
        Self::Pipeline(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self.body())).into_response()
    }
}
