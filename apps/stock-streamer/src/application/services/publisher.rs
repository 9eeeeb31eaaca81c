//! Quote Publisher
//!
//! Encodes a validated quote into a keyed record and delivers it to the
//! broker, retrying with backoff until the broker acknowledges or the attempt
//! budget runs out. Success is only reported after an acknowledgment.
//!
//! Delivery is at-least-once: if the process dies between the broker's
//! acknowledgment and the caller seeing the result, the caller may observe a
//! failure for a record that was delivered. Consumers that need exactness
//! deduplicate on `(symbol, observed_at)`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::application::ports::{Acknowledged, BrokerSinkPort, PublishRecord, SinkError};
use crate::application::services::backoff::{BackoffConfig, BackoffPolicy};
use crate::domain::quote::{NormalizedQuote, QuoteWireFormat};
use crate::infrastructure::metrics;

/// Publisher settings.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Destination topic.
    pub topic: String,
    /// Value encoding.
    pub wire_format: QuoteWireFormat,
    /// Backoff between delivery attempts.
    pub backoff: BackoffConfig,
    /// Longest wait for one acknowledgment.
    pub attempt_timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            topic: "stock_prices".to_string(),
            wire_format: QuoteWireFormat::JsonV1,
            backoff: BackoffConfig::with_initial_delay(Duration::from_millis(100)),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

/// Delivery failure after the publisher gave up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// Every attempt failed with a retryable error, or the sink is closed.
    #[error("broker unavailable after {attempts} attempt(s): {last_error}")]
    BrokerUnavailable {
        /// Attempts made.
        attempts: u32,
        /// Last attempt's failure.
        last_error: String,
    },

    /// The broker refused the record outright.
    #[error("broker rejected record after {attempts} attempt(s): {reason}")]
    Rejected {
        /// Attempts made.
        attempts: u32,
        /// Rejection details.
        reason: String,
    },

    /// Cancelled before an acknowledgment arrived.
    #[error("publish cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Attempts started before cancellation.
        attempts: u32,
    },
}

impl PublishError {
    /// Attempts made before giving up.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::BrokerUnavailable { attempts, .. }
            | Self::Rejected { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }
}

/// Delivers quotes to the broker through a shared sink.
pub struct Publisher {
    sink: Arc<dyn BrokerSinkPort>,
    config: PublisherConfig,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Publisher {
    /// Create a publisher over a shared sink.
    #[must_use]
    pub fn new(sink: Arc<dyn BrokerSinkPort>, config: PublisherConfig) -> Self {
        Self { sink, config }
    }

    /// Destination topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    /// Build the record for one delivery attempt.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Rejected`] if the quote cannot be encoded.
    pub fn record_for(
        &self,
        quote: &NormalizedQuote,
        delivery_attempt: u32,
    ) -> Result<PublishRecord, PublishError> {
        let value = self
            .config
            .wire_format
            .encode(quote)
            .map_err(|e| PublishError::Rejected {
                attempts: 0,
                reason: format!("encoding failed: {e}"),
            })?;

        Ok(PublishRecord {
            topic: self.config.topic.clone(),
            key: quote.symbol().as_bytes().to_vec(),
            value,
            delivery_attempt,
        })
    }

    /// Deliver `quote`, making at most `max_attempts` attempts.
    ///
    /// A `max_attempts` of zero is treated as one. Cancellation is checked
    /// before each attempt, during each attempt and during each backoff wait;
    /// once observed no further attempt is made.
    ///
    /// # Errors
    ///
    /// See [`PublishError`].
    #[tracing::instrument(
        name = "publish",
        skip_all,
        fields(symbol = %quote.symbol(), topic = %self.config.topic)
    )]
    pub async fn publish(
        &self,
        quote: &NormalizedQuote,
        max_attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<Acknowledged, PublishError> {
        let max_attempts = max_attempts.max(1);
        let mut record = self.record_for(quote, 0)?;
        let mut backoff = BackoffPolicy::new(self.config.backoff.clone());
        let mut last_error = SinkError::Timeout;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(PublishError::Cancelled {
                    attempts: attempt - 1,
                });
            }

            record.delivery_attempt = attempt;

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!(attempt, "Publish cancelled mid-attempt");
                    return Err(PublishError::Cancelled { attempts: attempt });
                }
                result = tokio::time::timeout(self.config.attempt_timeout, self.sink.send(&record)) => {
                    result.unwrap_or(Err(SinkError::Timeout))
                }
            };

            metrics::record_publish_attempt(result.as_ref().err().map(SinkError::kind));

            match result {
                Ok(ack) => {
                    tracing::debug!(
                        attempt,
                        partition = ack.partition,
                        offset = ack.offset,
                        "Broker acknowledged quote"
                    );
                    return Ok(Acknowledged {
                        attempts: attempt,
                        ..ack
                    });
                }
                Err(SinkError::Closed) => {
                    return Err(PublishError::BrokerUnavailable {
                        attempts: attempt,
                        last_error: SinkError::Closed.to_string(),
                    });
                }
                Err(e) if !e.is_retryable() => {
                    tracing::error!(attempt, error = %e, "Broker rejected quote");
                    return Err(PublishError::Rejected {
                        attempts: attempt,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(attempt, max_attempts, error = %e, "Publish attempt failed");
                    last_error = e;
                }
            }

            if attempt < max_attempts {
                let delay = backoff.next_delay();
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        return Err(PublishError::Cancelled { attempts: attempt });
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }

        Err(PublishError::BrokerUnavailable {
            attempts: max_attempts,
            last_error: last_error.to_string(),
        })
    }
}
