#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Stock Streamer - Quote Ingestion Service
//!
//! Fetches the latest price for a ticker from an upstream quote provider,
//! validates it, and publishes it to a broker topic, one pipeline run per
//! inbound request.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Quote types and rules
//!   - `quote`: symbols, raw payloads, validation, wire encoding
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interfaces for the quote source and broker sink
//!   - `services`: Ingestion pipeline, publisher, backoff
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `alpha_vantage`: REST quote source
//!   - `broker`: Kafka REST Proxy and in-memory sinks
//!   - `http`: Inbound endpoint, health, metrics
//!   - `config`: Environment configuration
//!
//! # Data Flow
//!
//! ```text
//! GET /stock/{symbol}
//!        │
//!        ▼
//! ┌────────────┐     ┌────────────┐     ┌────────────┐
//! │   Fetch    │────►│  Validate  │────►│  Publish   │──► topic
//! │ (provider) │     │  (domain)  │     │  (broker)  │
//! └────────────┘     └────────────┘     └────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Quote types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::quote::{
    DecodedQuote, NormalizedQuote, QuoteValidator, QuoteWireFormat, RawQuotePayload, Symbol,
    SymbolError, ValidationError, WireError,
};

// Ports
pub use application::ports::{
    Acknowledged, BrokerSinkPort, FetchError, PublishRecord, QuoteSourcePort, SinkError,
};

// Services
pub use application::services::{
    BackoffConfig, IngestionPipeline, PipelineConfig, PipelineError, PipelineOutcome,
    PipelineStage, PublishError, Publisher, PublisherConfig,
};

// Infrastructure config
pub use infrastructure::config::{
    BrokerMode, BrokerSettings, ConfigError, PipelineSettings, ProviderSettings, ServerSettings,
    ServiceConfig,
};

// Adapters (for integration tests)
pub use infrastructure::alpha_vantage::AlphaVantageClient;
pub use infrastructure::broker::{KafkaRestSink, RecordingSink};

// HTTP server
pub use infrastructure::http::{ApiServer, AppState, ServerError, router};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
