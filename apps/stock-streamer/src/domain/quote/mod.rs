//! Quote Domain Types
//!
//! A quote moves through three shapes on its way to the broker:
//!
//! ```text
//! Symbol ──fetch──► RawQuotePayload ──validate──► NormalizedQuote ──encode──► bytes
//! ```
//!
//! Each stage owns what it produces and hands it to the next stage by value.

mod normalized;
mod symbol;
mod validator;
mod wire;

use serde_json::{Map, Value};

pub use normalized::NormalizedQuote;
pub use symbol::{MAX_SYMBOL_LEN, Symbol, SymbolError};
pub use validator::{QuoteValidator, ValidationError};
pub use wire::{DecodedQuote, QuoteWireFormat, WireError};

/// Structured response body from the upstream provider.
///
/// Field names are whatever the provider uses; nothing is interpreted until
/// the payload reaches [`QuoteValidator`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQuotePayload {
    fields: Map<String, Value>,
}

impl RawQuotePayload {
    /// Wrap a provider object.
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Look up a field by its provider name.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Number of fields in the payload.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the payload carries no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for RawQuotePayload {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

impl<const N: usize> From<[(&str, Value); N]> for RawQuotePayload {
    fn from(entries: [(&str, Value); N]) -> Self {
        Self::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_lookup() {
        let payload = RawQuotePayload::from([("05. price", json!("10.00"))]);
        assert_eq!(payload.get("05. price"), Some(&json!("10.00")));
        assert!(payload.get("missing").is_none());
        assert_eq!(payload.len(), 1);
        assert!(!payload.is_empty());
    }

    #[test]
    fn empty_payload() {
        assert!(RawQuotePayload::default().is_empty());
    }
}
