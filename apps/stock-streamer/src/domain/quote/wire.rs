//! Broker Wire Format
//!
//! Record key is always the raw UTF-8 symbol, so a key-hashing partitioner
//! keeps every update for one symbol on one partition. The value encoding is
//! versioned:
//!
//! | Format    | Value bytes                                                              |
//! |-----------|--------------------------------------------------------------------------|
//! | `json-v1` | `{"v":1,"symbol":"ACME","price":"123.45","observed_at":"…Z"}` (UTF-8)    |
//! | `text-v0` | `123.45` (UTF-8 decimal, no symbol, no timestamp)                        |
//!
//! `json-v1` field order is fixed and the price is a decimal string, so equal
//! quotes always produce equal bytes.
//!
//! `text-v0` strips trailing zeros (`100.0000` → `100`). Plain-price readers
//! that parse the value as a number see the same price as they would for
//! float-formatted text such as `100.0`; byte-level comparison does not hold.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{NormalizedQuote, Symbol};

/// Current version tag written into `json-v1` values.
const JSON_V1: u8 = 1;

/// Value encoding used for published records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteWireFormat {
    /// Versioned JSON envelope.
    #[default]
    JsonV1,
    /// Bare decimal price text, trailing zeros stripped.
    TextV0,
}

impl QuoteWireFormat {
    /// Parse format name, falling back to `json-v1`.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "text-v0" | "text" => Self::TextV0,
            _ => Self::JsonV1,
        }
    }

    /// Format name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::JsonV1 => "json-v1",
            Self::TextV0 => "text-v0",
        }
    }

    /// Encode a quote's record value.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Json`] if serialization fails.
    pub fn encode(&self, quote: &NormalizedQuote) -> Result<Vec<u8>, WireError> {
        match self {
            Self::JsonV1 => {
                let envelope = EnvelopeOut {
                    v: JSON_V1,
                    symbol: quote.symbol().as_str(),
                    price: quote.price(),
                    observed_at: quote
                        .observed_at()
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                };
                Ok(serde_json::to_vec(&envelope)?)
            }
            Self::TextV0 => Ok(quote.price().to_string().into_bytes()),
        }
    }

    /// Decode a record back into its quote fields.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if the bytes are not a value of this format.
    pub fn decode(&self, key: &[u8], value: &[u8]) -> Result<DecodedQuote, WireError> {
        let key = std::str::from_utf8(key).map_err(|_| WireError::NotUtf8)?;
        let symbol = Symbol::parse(key).map_err(|e| WireError::InvalidKey(e.to_string()))?;

        match self {
            Self::JsonV1 => {
                let envelope: EnvelopeIn = serde_json::from_slice(value)?;
                if envelope.v != JSON_V1 {
                    return Err(WireError::UnsupportedVersion(envelope.v));
                }
                if envelope.symbol != symbol.as_str() {
                    return Err(WireError::InvalidKey(format!(
                        "key {symbol} does not match value symbol {}",
                        envelope.symbol
                    )));
                }
                Ok(DecodedQuote {
                    symbol,
                    price: envelope.price,
                    observed_at: Some(envelope.observed_at),
                })
            }
            Self::TextV0 => {
                let text = std::str::from_utf8(value).map_err(|_| WireError::NotUtf8)?;
                let price = text
                    .trim()
                    .parse::<Decimal>()
                    .map_err(|_| WireError::InvalidPrice(text.to_string()))?;
                Ok(DecodedQuote {
                    symbol,
                    price,
                    observed_at: None,
                })
            }
        }
    }
}

/// Quote fields recovered from a broker record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedQuote {
    /// Record key.
    pub symbol: Symbol,
    /// Quoted price.
    pub price: Decimal,
    /// Validation time, absent in `text-v0`.
    pub observed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    v: u8,
    symbol: &'a str,
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
    observed_at: String,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    v: u8,
    symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
    observed_at: DateTime<Utc>,
}

/// Wire encoding/decoding failure.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// JSON envelope could not be written or read.
    #[error("json envelope error: {0}")]
    Json(#[from] serde_json::Error),
    /// Envelope version this build does not understand.
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),
    /// Key or value bytes are not UTF-8.
    #[error("record is not valid UTF-8")]
    NotUtf8,
    /// Key is not a valid symbol or disagrees with the value.
    #[error("invalid record key: {0}")]
    InvalidKey(String),
    /// `text-v0` value is not a decimal.
    #[error("invalid price text: {0:?}")]
    InvalidPrice(String),
}
