//! Alpha Vantage Quote Source
//!
//! REST implementation of `QuoteSourcePort` against the `GLOBAL_QUOTE`
//! endpoint. One outbound call per fetch; retries belong to the pipeline.
//!
//! # Response Classification
//!
//! | Response                                   | Result                        |
//! |--------------------------------------------|-------------------------------|
//! | timeout                                    | `Timeout`                     |
//! | transport failure                          | `UpstreamUnavailable` (none)  |
//! | non-2xx                                    | `UpstreamUnavailable(status)` |
//! | `Note` / `Information` (throttling)        | `UpstreamUnavailable`         |
//! | `Error Message`, missing or empty quote    | `NotFound`                    |
//! | body not a JSON object                     | `MalformedBody`               |

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ports::{FetchError, QuoteSourcePort};
use crate::domain::quote::{RawQuotePayload, Symbol};
use crate::infrastructure::config::ProviderSettings;

const QUOTE_KEY: &str = "Global Quote";
const ERROR_KEY: &str = "Error Message";
const THROTTLE_KEYS: [&str; 2] = ["Note", "Information"];

/// Alpha Vantage `GLOBAL_QUOTE` client.
pub struct AlphaVantageClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for AlphaVantageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaVantageClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl AlphaVantageClient {
    /// Create a client from provider settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: &ProviderSettings) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("stock-streamer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key().to_string(),
        })
    }

    fn transport_error(error: reqwest::Error, timeout: Duration) -> FetchError {
        if error.is_timeout() {
            return FetchError::Timeout { after: timeout };
        }
        // The query string carries the API key.
        let error = error.without_url();
        FetchError::UpstreamUnavailable {
            status: error.status().map(|s| s.as_u16()),
            reason: error.to_string(),
        }
    }
}

#[async_trait]
impl QuoteSourcePort for AlphaVantageClient {
    async fn fetch(
        &self,
        symbol: &Symbol,
        timeout: Duration,
    ) -> Result<RawQuotePayload, FetchError> {
        let url = format!("{}/query", self.base_url);

        tracing::debug!(symbol = %symbol, "Requesting GLOBAL_QUOTE");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol.as_str()),
                ("apikey", self.api_key.as_str()),
            ])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamUnavailable {
                status: Some(status.as_u16()),
                reason: format!("provider returned {status}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::transport_error(e, timeout))?;

        parse_global_quote(symbol, &body)
    }
}

/// Classify a 2xx `GLOBAL_QUOTE` body.
fn parse_global_quote(symbol: &Symbol, body: &str) -> Result<RawQuotePayload, FetchError> {
    let value: Value = serde_json::from_str(body).map_err(|e| FetchError::MalformedBody {
        reason: format!("invalid JSON: {e}"),
    })?;

    let Value::Object(mut root) = value else {
        return Err(FetchError::MalformedBody {
            reason: "top-level value is not an object".to_string(),
        });
    };

    if let Some(notice) = THROTTLE_KEYS.iter().find_map(|key| root.get(*key)) {
        tracing::warn!(symbol = %symbol, notice = %notice, "Provider throttled request");
        return Err(FetchError::UpstreamUnavailable {
            status: None,
            reason: "rate limited".to_string(),
        });
    }

    if root.contains_key(ERROR_KEY) {
        return Err(FetchError::NotFound {
            symbol: symbol.to_string(),
        });
    }

    match root.remove(QUOTE_KEY) {
        Some(Value::Object(fields)) if !fields.is_empty() => Ok(RawQuotePayload::new(fields)),
        Some(Value::Object(_)) | None => Err(FetchError::NotFound {
            symbol: symbol.to_string(),
        }),
        Some(other) => Err(FetchError::MalformedBody {
            reason: format!("\"{QUOTE_KEY}\" is not an object: {other}"),
        }),
    }
}
