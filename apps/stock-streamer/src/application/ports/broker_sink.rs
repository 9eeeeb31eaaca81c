//! Broker Sink Port (Driven Port)
//!
//! Interface for delivering one record to a broker topic.

use async_trait::async_trait;

/// One delivery attempt of an encoded quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRecord {
    /// Destination topic.
    pub topic: String,
    /// Partitioning key (raw symbol bytes).
    pub key: Vec<u8>,
    /// Encoded quote.
    pub value: Vec<u8>,
    /// 1-based attempt number.
    pub delivery_attempt: u32,
}

/// Broker receipt for a delivered record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledged {
    /// Topic written to.
    pub topic: String,
    /// Partition the record landed on.
    pub partition: i32,
    /// Offset within the partition.
    pub offset: i64,
    /// Attempts it took, including the successful one.
    pub attempts: u32,
}

/// Single delivery attempt failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// Could not reach the broker.
    #[error("broker connection error: {message}")]
    Connection {
        /// Error details.
        message: String,
    },

    /// No acknowledgment within the attempt timeout.
    #[error("broker did not acknowledge in time")]
    Timeout,

    /// Broker is up but could not take the record right now.
    #[error("broker unavailable (status {status:?}): {message}")]
    Unavailable {
        /// HTTP status, if any.
        status: Option<u16>,
        /// Error details.
        message: String,
    },

    /// Broker refused the record; resending it will not help.
    #[error("broker rejected record (status {status}): {message}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Error details.
        message: String,
    },

    /// The sink was closed during shutdown.
    #[error("broker sink is closed")]
    Closed,
}

impl SinkError {
    /// Whether another attempt could plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Timeout | Self::Unavailable { .. }
        )
    }

    /// Stable label for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Timeout => "timeout",
            Self::Unavailable { .. } => "unavailable",
            Self::Rejected { .. } => "rejected",
            Self::Closed => "closed",
        }
    }
}

/// Port for delivering records to the broker.
///
/// The connection behind an implementation is shared by every concurrent
/// pipeline run, so `send` must be safe to call concurrently without
/// external locking. An `Ok` means the broker acknowledged the record; an
/// `Err` means it did not take it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerSinkPort: Send + Sync {
    /// Deliver one record and wait for the broker's acknowledgment.
    async fn send(&self, record: &PublishRecord) -> Result<Acknowledged, SinkError>;

    /// Flush and release the connection. Later sends fail with
    /// [`SinkError::Closed`].
    async fn close(&self) -> Result<(), SinkError>;
}
