//! Prometheus Metrics Module
//!
//! Exposes pipeline metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Outcomes**: Pipeline results by outcome code
//! - **Attempts**: Fetch and publish attempts by result
//! - **Latency**: Time spent in each pipeline stage
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the HTTP server port. Recording
//! before [`init_metrics`] is a no-op.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::application::services::PipelineStage;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if another global recorder was already installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

const OUTCOMES: &str = "stock_streamer_pipeline_outcomes_total";
const FETCH_ATTEMPTS: &str = "stock_streamer_fetch_attempts_total";
const PUBLISH_ATTEMPTS: &str = "stock_streamer_publish_attempts_total";
const STAGE_SECONDS: &str = "stock_streamer_stage_duration_seconds";

fn register_metrics() {
    describe_counter!(OUTCOMES, "Pipeline runs by outcome code");
    describe_counter!(FETCH_ATTEMPTS, "Upstream fetch attempts by result");
    describe_counter!(PUBLISH_ATTEMPTS, "Broker delivery attempts by result");
    describe_histogram!(STAGE_SECONDS, "Time spent in each pipeline stage");
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a finished pipeline run (`"success"` or an error code).
pub fn record_outcome(outcome: &'static str) {
    counter!(OUTCOMES, "outcome" => outcome).increment(1);
}

/// Record one fetch attempt; `None` means it succeeded.
pub fn record_fetch_attempt(error_kind: Option<&'static str>) {
    counter!(FETCH_ATTEMPTS, "result" => error_kind.unwrap_or("ok")).increment(1);
}

/// Record one delivery attempt; `None` means it was acknowledged.
pub fn record_publish_attempt(error_kind: Option<&'static str>) {
    counter!(PUBLISH_ATTEMPTS, "result" => error_kind.unwrap_or("ok")).increment(1);
}

/// Record time spent in a stage.
pub fn record_stage_duration(stage: PipelineStage, duration: Duration) {
    histogram!(STAGE_SECONDS, "stage" => stage.as_str()).record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================
