//! Ingestion Pipeline
//!
//! Serves one symbol request end to end and returns exactly one outcome.
//!
//! # State Machine
//!
//! ```text
//! Fetching ──► Validating ──► Publishing ──► Done
//!    │             │              │
//!    └─────────────┴──────────────┴──► Failed(PipelineError)
//! ```
//!
//! Retry decisions live here and nowhere else:
//!
//! - `Timeout` / `UpstreamUnavailable` from the source: retried with backoff up
//!   to `fetch_max_attempts`, all inside `fetch_stage_budget`
//! - `NotFound` / malformed body: terminal on the first attempt
//! - validation failures: terminal, the same payload parses the same way twice
//! - publish failures: the publisher retries internally; whatever it finally
//!   reports is terminal here
//!
//! A run holds no lock and keeps no state between calls; two concurrent runs
//! for the same symbol only share the broker sink. Records for the same
//! symbol from concurrent runs may reach the broker in either order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{FetchError, QuoteSourcePort};
use crate::application::services::backoff::{BackoffConfig, BackoffPolicy};
use crate::application::services::publisher::{PublishError, Publisher};
use crate::domain::quote::{NormalizedQuote, QuoteValidator, RawQuotePayload, Symbol, ValidationError};
use crate::infrastructure::metrics;

/// Result of one pipeline run.
pub type PipelineOutcome = Result<NormalizedQuote, PipelineError>;

/// Pipeline stage, used to tag failures and timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Calling the upstream provider.
    Fetching,
    /// Checking the payload.
    Validating,
    /// Delivering to the broker.
    Publishing,
}

impl PipelineStage {
    /// Stage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Validating => "validating",
            Self::Publishing => "publishing",
        }
    }
}

/// Pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Timeout for one call to the provider.
    pub fetch_timeout: Duration,
    /// Fetch attempts for retryable failures, including the first.
    pub fetch_max_attempts: u32,
    /// Backoff between fetch attempts.
    pub fetch_backoff: BackoffConfig,
    /// Wall-clock budget for the whole fetch stage, retries included.
    pub fetch_stage_budget: Duration,
    /// Delivery attempts handed to the publisher.
    pub publish_max_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(5),
            fetch_max_attempts: 3,
            fetch_backoff: BackoffConfig::default(),
            fetch_stage_budget: Duration::from_secs(20),
            publish_max_attempts: 5,
        }
    }
}

/// Terminal failure of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The fetch stage ran past its budget.
    #[error("upstream timed out after {attempts} attempt(s) within {budget:?}")]
    UpstreamTimeout {
        /// Fetch stage budget.
        budget: Duration,
        /// Attempts started before the budget ran out.
        attempts: u32,
    },

    /// Every fetch attempt failed with a retryable error.
    #[error("upstream unavailable after {attempts} attempt(s): {last_error}")]
    UpstreamUnavailable {
        /// Attempts made.
        attempts: u32,
        /// Last attempt's failure.
        last_error: FetchError,
    },

    /// The provider does not know the symbol.
    #[error("symbol not found: {symbol}")]
    SymbolNotFound {
        /// The unknown symbol.
        symbol: String,
    },

    /// The provider broke its response contract.
    #[error("malformed upstream payload: {reason}")]
    MalformedUpstreamPayload {
        /// What was wrong.
        reason: String,
    },

    /// The provider quoted a zero or negative price.
    #[error("implausible quote value: {price}")]
    ImplausibleQuoteValue {
        /// The rejected price.
        price: Decimal,
    },

    /// The broker never acknowledged the record.
    #[error("{0}")]
    BrokerUnavailable(PublishError),

    /// The broker refused the record.
    #[error("{0}")]
    BrokerRejected(PublishError),

    /// The request went away before the pipeline finished.
    #[error("cancelled while {}", .stage.as_str())]
    Cancelled {
        /// Stage in progress when cancellation was seen.
        stage: PipelineStage,
    },
}

impl PipelineError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::SymbolNotFound { .. } => "symbol_not_found",
            Self::MalformedUpstreamPayload { .. } => "malformed_upstream_payload",
            Self::ImplausibleQuoteValue { .. } => "implausible_quote_value",
            Self::BrokerUnavailable(_) => "broker_unavailable",
            Self::BrokerRejected(_) => "broker_rejected",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Stage the run failed in.
    #[must_use]
    pub const fn stage(&self) -> PipelineStage {
        match self {
            Self::UpstreamTimeout { .. }
            | Self::UpstreamUnavailable { .. }
            | Self::SymbolNotFound { .. } => PipelineStage::Fetching,
            Self::MalformedUpstreamPayload { .. } | Self::ImplausibleQuoteValue { .. } => {
                PipelineStage::Validating
            }
            Self::BrokerUnavailable(_) | Self::BrokerRejected(_) => PipelineStage::Publishing,
            Self::Cancelled { stage } => *stage,
        }
    }

    /// Whether the caller could reasonably retry the whole request later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamTimeout { .. }
                | Self::UpstreamUnavailable { .. }
                | Self::BrokerUnavailable(_)
                | Self::Cancelled { .. }
        )
    }

    fn from_terminal_fetch(err: FetchError) -> Self {
        match err {
            FetchError::NotFound { symbol } => Self::SymbolNotFound { symbol },
            FetchError::MalformedBody { reason } => Self::MalformedUpstreamPayload { reason },
            other => Self::MalformedUpstreamPayload {
                reason: other.to_string(),
            },
        }
    }

    fn from_validation(err: ValidationError) -> Self {
        match err {
            ValidationError::ImplausibleValue { price } => Self::ImplausibleQuoteValue { price },
            other => Self::MalformedUpstreamPayload {
                reason: other.to_string(),
            },
        }
    }

    fn from_publish(err: PublishError) -> Self {
        match err {
            PublishError::Cancelled { .. } => Self::Cancelled {
                stage: PipelineStage::Publishing,
            },
            PublishError::Rejected { .. } => Self::BrokerRejected(err),
            PublishError::BrokerUnavailable { .. } => Self::BrokerUnavailable(err),
        }
    }
}

/// Fetch → validate → publish for one symbol.
pub struct IngestionPipeline {
    source: Arc<dyn QuoteSourcePort>,
    validator: QuoteValidator,
    publisher: Publisher,
    config: PipelineConfig,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("validator", &self.validator)
            .field("publisher", &self.publisher)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl IngestionPipeline {
    /// Assemble a pipeline from its stages.
    #[must_use]
    pub fn new(
        source: Arc<dyn QuoteSourcePort>,
        validator: QuoteValidator,
        publisher: Publisher,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            validator,
            publisher,
            config,
        }
    }

    /// The publisher used for the last stage.
    #[must_use]
    pub const fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Run the pipeline for one symbol.
    ///
    /// Cancelling `cancel` stops the run at the next suspension point and
    /// yields [`PipelineError::Cancelled`]; nothing is retried afterwards.
    #[tracing::instrument(name = "ingest", skip_all, fields(symbol = %symbol))]
    pub async fn run(&self, symbol: &Symbol, cancel: &CancellationToken) -> PipelineOutcome {
        let started = Instant::now();
        let outcome = self.execute(symbol, cancel).await;

        match &outcome {
            Ok(quote) => {
                metrics::record_outcome("success");
                tracing::info!(
                    price = %quote.price(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "Quote ingested"
                );
            }
            Err(e) => {
                metrics::record_outcome(e.code());
                tracing::warn!(
                    code = e.code(),
                    stage = e.stage().as_str(),
                    retryable = e.is_retryable(),
                    error = %e,
                    "Quote ingestion failed"
                );
            }
        }

        outcome
    }

    async fn execute(&self, symbol: &Symbol, cancel: &CancellationToken) -> PipelineOutcome {
        let stage_started = Instant::now();
        let payload = self.fetch_stage(symbol, cancel).await;
        metrics::record_stage_duration(PipelineStage::Fetching, stage_started.elapsed());
        let payload = payload?;

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled {
                stage: PipelineStage::Validating,
            });
        }

        let stage_started = Instant::now();
        let quote = self
            .validator
            .validate(payload, symbol)
            .map_err(PipelineError::from_validation);
        metrics::record_stage_duration(PipelineStage::Validating, stage_started.elapsed());
        let quote = quote?;

        let stage_started = Instant::now();
        let ack = self
            .publisher
            .publish(&quote, self.config.publish_max_attempts, cancel)
            .await;
        metrics::record_stage_duration(PipelineStage::Publishing, stage_started.elapsed());
        let ack = ack.map_err(PipelineError::from_publish)?;

        tracing::debug!(
            partition = ack.partition,
            offset = ack.offset,
            attempts = ack.attempts,
            "Quote published"
        );
        Ok(quote)
    }

    async fn fetch_stage(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> Result<RawQuotePayload, PipelineError> {
        let budget = self.config.fetch_stage_budget;
        let mut attempts = 0;

        let result =
            tokio::time::timeout(budget, self.fetch_with_retry(symbol, cancel, &mut attempts))
                .await;
        result.unwrap_or(Err(PipelineError::UpstreamTimeout { budget, attempts }))
    }

    async fn fetch_with_retry(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
        attempts: &mut u32,
    ) -> Result<RawQuotePayload, PipelineError> {
        let max_attempts = self.config.fetch_max_attempts.max(1);
        let timeout = self.config.fetch_timeout;
        let mut backoff = BackoffPolicy::new(self.config.fetch_backoff.clone());
        let cancelled = || PipelineError::Cancelled {
            stage: PipelineStage::Fetching,
        };

        loop {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }

            *attempts += 1;
            let attempt = *attempts;

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancelled()),
                result = tokio::time::timeout(timeout, self.source.fetch(symbol, timeout)) => {
                    result.unwrap_or(Err(FetchError::Timeout { after: timeout }))
                }
            };

            metrics::record_fetch_attempt(result.as_ref().err().map(FetchError::kind));

            let err = match result {
                Ok(payload) => return Ok(payload),
                Err(err) if !err.is_retryable() => {
                    return Err(PipelineError::from_terminal_fetch(err));
                }
                Err(err) => err,
            };

            if attempt >= max_attempts {
                return Err(PipelineError::UpstreamUnavailable {
                    attempts: attempt,
                    last_error: err,
                });
            }

            let delay = backoff.next_delay();
            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis(),
                error = %err,
                "Fetch attempt failed, retrying"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancelled()),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}
