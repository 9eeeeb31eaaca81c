//! Service Configuration Settings
//!
//! Configuration types for the quote ingestion service, loaded from
//! environment variables.

use std::time::Duration;

use crate::application::services::{BackoffConfig, PipelineConfig, PublisherConfig};
use crate::domain::quote::QuoteWireFormat;

/// Upstream quote provider settings.
#[derive(Clone)]
pub struct ProviderSettings {
    /// Provider base URL.
    pub base_url: String,
    api_key: String,
}

impl ProviderSettings {
    /// Default provider base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://www.alphavantage.co";

    /// Create provider settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Which broker sink to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrokerMode {
    /// Kafka REST Proxy.
    #[default]
    KafkaRest,
    /// In-process recording sink, for local runs without a broker.
    Memory,
}

impl BrokerMode {
    /// Parse mode from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            _ => Self::KafkaRest,
        }
    }

    /// Get the mode name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::KafkaRest => "kafka-rest",
            Self::Memory => "memory",
        }
    }
}

/// Broker sink settings.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    /// Sink implementation.
    pub mode: BrokerMode,
    /// Kafka REST Proxy base URL.
    pub rest_proxy_url: String,
    /// Destination topic.
    pub topic: String,
    /// Record value encoding.
    pub wire_format: QuoteWireFormat,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            mode: BrokerMode::KafkaRest,
            rest_proxy_url: "http://localhost:8082".to_string(),
            topic: "stock_prices".to_string(),
            wire_format: QuoteWireFormat::JsonV1,
        }
    }
}

/// Retry and timeout settings for the pipeline stages.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Timeout for one provider call.
    pub fetch_timeout: Duration,
    /// Fetch attempts for retryable failures.
    pub fetch_max_attempts: u32,
    /// First fetch retry delay.
    pub fetch_backoff_initial: Duration,
    /// Budget for the whole fetch stage.
    pub fetch_stage_budget: Duration,
    /// Broker delivery attempts.
    pub publish_max_attempts: u32,
    /// First delivery retry delay.
    pub publish_backoff_initial: Duration,
    /// Timeout for one delivery attempt.
    pub publish_attempt_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_millis(5000),
            fetch_max_attempts: 3,
            fetch_backoff_initial: Duration::from_millis(250),
            fetch_stage_budget: Duration::from_secs(20),
            publish_max_attempts: 5,
            publish_backoff_initial: Duration::from_millis(100),
            publish_attempt_timeout: Duration::from_millis(5000),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// HTTP port for the quote endpoint, health and metrics.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Upstream provider.
    pub provider: ProviderSettings,
    /// Broker sink.
    pub broker: BrokerSettings,
    /// Pipeline retry and timeout policy.
    pub pipeline: PipelineSettings,
    /// HTTP server.
    pub server: ServerSettings,
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `ALPHA_VANTAGE_API_KEY` is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if `ALPHA_VANTAGE_API_KEY` is missing or empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("ALPHA_VANTAGE_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("ALPHA_VANTAGE_API_KEY".to_string()))?;

        if api_key.trim().is_empty() {
            return Err(ConfigError::EmptyValue("ALPHA_VANTAGE_API_KEY".to_string()));
        }

        let provider = ProviderSettings::new(
            lookup("ALPHA_VANTAGE_URL")
                .unwrap_or_else(|| ProviderSettings::DEFAULT_BASE_URL.to_string()),
            api_key,
        );

        let broker_defaults = BrokerSettings::default();
        let broker = BrokerSettings {
            mode: lookup("BROKER_MODE")
                .map(|s| BrokerMode::from_str_case_insensitive(&s))
                .unwrap_or_default(),
            rest_proxy_url: lookup("KAFKA_REST_PROXY_URL")
                .unwrap_or(broker_defaults.rest_proxy_url),
            topic: lookup("KAFKA_TOPIC")
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(broker_defaults.topic),
            wire_format: lookup("QUOTE_WIRE_FORMAT")
                .map(|s| QuoteWireFormat::from_str_case_insensitive(&s))
                .unwrap_or_default(),
        };

        let defaults = PipelineSettings::default();
        let pipeline = PipelineSettings {
            fetch_timeout: parse_duration_millis(&lookup, "FETCH_TIMEOUT_MS", defaults.fetch_timeout),
            fetch_max_attempts: parse_u32(&lookup, "FETCH_MAX_ATTEMPTS", defaults.fetch_max_attempts),
            fetch_backoff_initial: parse_duration_millis(
                &lookup,
                "FETCH_BACKOFF_INITIAL_MS",
                defaults.fetch_backoff_initial,
            ),
            fetch_stage_budget: parse_duration_secs(
                &lookup,
                "FETCH_STAGE_BUDGET_SECS",
                defaults.fetch_stage_budget,
            ),
            publish_max_attempts: parse_u32(
                &lookup,
                "PUBLISH_MAX_ATTEMPTS",
                defaults.publish_max_attempts,
            ),
            publish_backoff_initial: parse_duration_millis(
                &lookup,
                "PUBLISH_BACKOFF_INITIAL_MS",
                defaults.publish_backoff_initial,
            ),
            publish_attempt_timeout: parse_duration_millis(
                &lookup,
                "PUBLISH_ATTEMPT_TIMEOUT_MS",
                defaults.publish_attempt_timeout,
            ),
        };

        let server = ServerSettings {
            port: lookup("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(ServerSettings::default().port),
        };

        Ok(Self {
            provider,
            broker,
            pipeline,
            server,
        })
    }

    /// Pipeline policy derived from these settings.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            fetch_timeout: self.pipeline.fetch_timeout,
            fetch_max_attempts: self.pipeline.fetch_max_attempts,
            fetch_backoff: BackoffConfig::with_initial_delay(self.pipeline.fetch_backoff_initial),
            fetch_stage_budget: self.pipeline.fetch_stage_budget,
            publish_max_attempts: self.pipeline.publish_max_attempts,
        }
    }

    /// Publisher settings derived from these settings.
    #[must_use]
    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            topic: self.broker.topic.clone(),
            wire_format: self.broker.wire_format,
            backoff: BackoffConfig::with_initial_delay(self.pipeline.publish_backoff_initial),
            attempt_timeout: self.pipeline.publish_attempt_timeout,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_u32<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: u32) -> u32 {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .filter(|&v| v > 0)
        .unwrap_or(default)
}

fn parse_duration_secs<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|&v| v > 0)
        .map_or(default, Duration::from_secs)
}

fn parse_duration_millis<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|&v| v > 0)
        .map_or(default, Duration::from_millis)
}
