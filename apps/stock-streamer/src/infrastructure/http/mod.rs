//! HTTP Surface
//!
//! Inbound HTTP endpoint that triggers the pipeline, plus health and metrics.
//!
//! # Endpoints
//!
//! - `GET /stock/{symbol}` - Fetch, validate and publish one quote
//! - `GET /health` - JSON health status with pipeline counters
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /metrics` - Prometheus metrics in text format

mod error;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::application::services::IngestionPipeline;
use crate::domain::quote::Symbol;
use crate::infrastructure::metrics::get_metrics_handle;

pub use error::{ApiError, ErrorBody};

// =============================================================================
// Response Types
// =============================================================================

/// Successful `/stock/{symbol}` response.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteResponse {
    /// Normalized ticker.
    pub symbol: String,
    /// Published price, as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests.
    pub status: &'static str,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Destination topic.
    pub topic: String,
    /// Pipeline counters since startup.
    pub pipeline: PipelineCounters,
}

/// Pipeline run counters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PipelineCounters {
    /// Runs started.
    pub requests: u64,
    /// Runs that published a quote.
    pub succeeded: u64,
    /// Runs that failed.
    pub failed: u64,
}

// =============================================================================
// Server State
// =============================================================================

/// Shared state for the HTTP server.
pub struct AppState {
    version: String,
    started_at: Instant,
    pipeline: Arc<IngestionPipeline>,
    shutdown: CancellationToken,
    requests: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl AppState {
    /// Create server state around a pipeline.
    ///
    /// Every request runs under a child of `shutdown`.
    #[must_use]
    pub fn new(version: String, pipeline: Arc<IngestionPipeline>, shutdown: CancellationToken) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            pipeline,
            shutdown,
            requests: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Current counter values.
    #[must_use]
    pub fn counters(&self) -> PipelineCounters {
        PipelineCounters {
            requests: self.requests.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Build the router over shared state.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/stock/{symbol}", get(stock_handler))
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// API Server
// =============================================================================

/// HTTP server for the quote endpoint.
pub struct ApiServer {
    port: u16,
    state: Arc<AppState>,
    cancel: CancellationToken,
}

impl ApiServer {
    /// Create a new server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<AppState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled, then drain open connections.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn stock_handler(
    State(state): State<Arc<AppState>>,
    Path(raw_symbol): Path<String>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let symbol = Symbol::parse(&raw_symbol)?;
    let request_id = Uuid::new_v4();

    // Dropping the handler (client went away) cancels the run.
    let cancel = state.shutdown.child_token();
    let _cancel_on_drop = cancel.clone().drop_guard();

    state.requests.fetch_add(1, Ordering::Relaxed);
    let span = tracing::info_span!("request", %request_id);
    let outcome = state.pipeline.run(&symbol, &cancel).instrument(span).await;

    match outcome {
        Ok(quote) => {
            state.succeeded.fetch_add(1, Ordering::Relaxed);
            Ok(Json(QuoteResponse {
                symbol: quote.symbol().to_string(),
                price: quote.price(),
            }))
        }
        Err(e) => {
            state.failed.fetch_add(1, Ordering::Relaxed);
            Err(e.into())
        }
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy",
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        topic: state.pipeline.publisher().topic().to_string(),
        pipeline: state.counters(),
    };
    (StatusCode::OK, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

// =============================================================================
// Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
