//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Alpha Vantage quote source.
pub mod alpha_vantage;

/// Broker sinks (Kafka REST Proxy, in-memory).
pub mod broker;

/// Configuration loading.
pub mod config;

/// HTTP endpoint, health and metrics.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// OpenTelemetry tracing integration.
pub mod telemetry;
