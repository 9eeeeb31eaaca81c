//! Stock Streamer Binary
//!
//! Starts the quote ingestion HTTP service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin stock-streamer
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `ALPHA_VANTAGE_API_KEY`: Quote provider API key
//!
//! ## Optional
//! - `ALPHA_VANTAGE_URL`: Provider base URL (default: <https://www.alphavantage.co>)
//! - `BROKER_MODE`: kafka-rest | memory (default: kafka-rest)
//! - `KAFKA_REST_PROXY_URL`: REST Proxy URL (default: <http://localhost:8082>)
//! - `KAFKA_TOPIC`: Destination topic (default: `stock_prices`)
//! - `QUOTE_WIRE_FORMAT`: json-v1 | text-v0 (default: json-v1)
//! - `SERVER_PORT`: HTTP port (default: 8000)
//! - `FETCH_TIMEOUT_MS`, `FETCH_MAX_ATTEMPTS`, `FETCH_BACKOFF_INITIAL_MS`,
//!   `FETCH_STAGE_BUDGET_SECS`: fetch retry policy
//! - `PUBLISH_MAX_ATTEMPTS`, `PUBLISH_BACKOFF_INITIAL_MS`,
//!   `PUBLISH_ATTEMPT_TIMEOUT_MS`: publish retry policy
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: stock-streamer)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use stock_streamer::infrastructure::telemetry;
use stock_streamer::{
    AlphaVantageClient, ApiServer, AppState, BrokerMode, BrokerSinkPort, IngestionPipeline,
    KafkaRestSink, Publisher, QuoteValidator, RecordingSink, ServiceConfig, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Stock Streamer");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = ServiceConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let source = Arc::new(
        AlphaVantageClient::new(&config.provider).context("failed to build provider client")?,
    );

    let sink: Arc<dyn BrokerSinkPort> = match config.broker.mode {
        BrokerMode::KafkaRest => Arc::new(
            KafkaRestSink::new(&config.broker.rest_proxy_url)
                .context("failed to build broker client")?,
        ),
        BrokerMode::Memory => {
            tracing::warn!("BROKER_MODE=memory, quotes are kept in process only");
            Arc::new(RecordingSink::new())
        }
    };

    let publisher = Publisher::new(Arc::clone(&sink), config.publisher_config());
    let pipeline = Arc::new(IngestionPipeline::new(
        source,
        QuoteValidator::default(),
        publisher,
        config.pipeline_config(),
    ));

    let state = Arc::new(AppState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        pipeline,
        shutdown_token.clone(),
    ));
    let server = ApiServer::new(config.server.port, state, shutdown_token.clone());
    let mut server_task = tokio::spawn(server.run());

    tracing::info!("Stock streamer ready");

    // A server that exits before any signal (e.g. bind failure) ends the process.
    let server_result = tokio::select! {
        joined = &mut server_task => {
            shutdown_token.cancel();
            Some(joined)
        }
        () = await_shutdown(shutdown_token.clone()) => None,
    };

    let server_result = match server_result {
        Some(joined) => Some(joined),
        None => tokio::time::timeout(SHUTDOWN_TIMEOUT, server_task)
            .await
            .map_err(|_| tracing::warn!("HTTP server did not drain in time"))
            .ok(),
    };

    if let Err(e) = sink.close().await {
        tracing::warn!(error = %e, "Failed to close broker sink");
    }

    match server_result {
        Some(Ok(Ok(()))) | None => {}
        Some(Ok(Err(e))) => {
            tracing::error!(error = %e, "HTTP server error");
            return Err(e).context("HTTP server failed");
        }
        Some(Err(e)) => {
            tracing::error!(error = %e, "HTTP server task failed");
            return Err(e).context("HTTP server task panicked");
        }
    }

    tracing::info!("Stock streamer stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &ServiceConfig) {
    tracing::info!(
        broker_mode = config.broker.mode.as_str(),
        topic = %config.broker.topic,
        wire_format = config.broker.wire_format.as_str(),
        port = config.server.port,
        "Configuration loaded"
    );
    tracing::debug!(
        provider_url = %config.provider.base_url,
        rest_proxy_url = %config.broker.rest_proxy_url,
        fetch_max_attempts = config.pipeline.fetch_max_attempts,
        publish_max_attempts = config.pipeline.publish_max_attempts,
        "Endpoints and retry policy"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
