//! Quote Source Port (Driven Port)
//!
//! Interface for fetching one quote from the upstream provider.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::quote::{RawQuotePayload, Symbol};

/// Quote fetch failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The provider did not answer within the caller's timeout.
    #[error("upstream did not respond within {after:?}")]
    Timeout {
        /// Timeout that elapsed.
        after: Duration,
    },

    /// Transport failure, non-2xx status, or provider throttling.
    #[error("upstream unavailable (status {status:?}): {reason}")]
    UpstreamUnavailable {
        /// HTTP status, if a response was received.
        status: Option<u16>,
        /// Error details.
        reason: String,
    },

    /// The provider does not know the symbol.
    #[error("symbol not found upstream: {symbol}")]
    NotFound {
        /// The unknown symbol.
        symbol: String,
    },

    /// The provider answered 2xx with a body that is not the agreed shape.
    #[error("malformed upstream body: {reason}")]
    MalformedBody {
        /// Error details.
        reason: String,
    },
}

impl FetchError {
    /// Whether a fresh attempt could plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::UpstreamUnavailable { .. })
    }

    /// Stable label for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::NotFound { .. } => "not_found",
            Self::MalformedBody { .. } => "malformed_body",
        }
    }
}

/// Port for fetching quotes from the upstream provider.
///
/// Implementations make exactly one outbound call per invocation, never
/// retry and never cache.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSourcePort: Send + Sync {
    /// Fetch the raw quote payload for `symbol`, giving up after `timeout`.
    async fn fetch(
        &self,
        symbol: &Symbol,
        timeout: Duration,
    ) -> Result<RawQuotePayload, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(FetchError::Timeout { after: Duration::from_secs(1) }, true ; "timeout")]
    #[test_case(FetchError::UpstreamUnavailable { status: Some(503), reason: String::new() }, true ; "unavailable")]
    #[test_case(FetchError::NotFound { symbol: "ACME".into() }, false ; "not found")]
    #[test_case(FetchError::MalformedBody { reason: String::new() }, false ; "malformed")]
    fn retry_classification(err: FetchError, retryable: bool) {
        assert_eq!(err.is_retryable(), retryable);
    }

    #[test]
    fn kinds() {
        assert_eq!(
            FetchError::Timeout {
                after: Duration::ZERO
            }
            .kind(),
            "timeout"
        );
        assert_eq!(
            FetchError::NotFound {
                symbol: "X".into()
            }
            .kind(),
            "not_found"
        );
    }
}
