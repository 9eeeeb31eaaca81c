//! Payload validation.
//!
//! Turns a provider payload into a [`NormalizedQuote`] or says exactly why it
//! cannot. Validation is pure: re-running it on the same payload always gives
//! the same answer, so none of these failures are ever retried.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use super::{NormalizedQuote, RawQuotePayload, Symbol};

/// Provider field holding the last traded price.
pub const DEFAULT_PRICE_FIELD: &str = "05. price";

/// Provider field echoing the requested symbol.
pub const DEFAULT_SYMBOL_FIELD: &str = "01. symbol";

/// Why a payload could not become a quote.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The price field is absent or null.
    #[error("payload is missing field {field:?}")]
    MissingField {
        /// Provider field name.
        field: String,
    },
    /// The price field is not a finite decimal number.
    #[error("field {field:?} is not a decimal number: {raw:?}")]
    MalformedNumber {
        /// Provider field name.
        field: String,
        /// The value as received.
        raw: String,
    },
    /// Zero or negative price.
    #[error("implausible quote price {price}")]
    ImplausibleValue {
        /// The rejected price.
        price: Decimal,
    },
    /// The provider answered for a different symbol than requested.
    #[error("payload is for {actual}, expected {expected}")]
    SymbolMismatch {
        /// Symbol requested.
        expected: String,
        /// Symbol the provider reported.
        actual: String,
    },
}

impl ValidationError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "missing_field",
            Self::MalformedNumber { .. } => "malformed_number",
            Self::ImplausibleValue { .. } => "implausible_value",
            Self::SymbolMismatch { .. } => "symbol_mismatch",
        }
    }
}

/// Checks provider payloads for shape and economic sanity.
#[derive(Debug, Clone)]
pub struct QuoteValidator {
    price_field: String,
    symbol_field: String,
}

impl Default for QuoteValidator {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_FIELD, DEFAULT_SYMBOL_FIELD)
    }
}

impl QuoteValidator {
    /// Create a validator reading the given provider field names.
    #[must_use]
    pub fn new(price_field: impl Into<String>, symbol_field: impl Into<String>) -> Self {
        Self {
            price_field: price_field.into(),
            symbol_field: symbol_field.into(),
        }
    }

    /// Validate a payload, stamping it with the current time.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn validate(
        &self,
        payload: RawQuotePayload,
        expected: &Symbol,
    ) -> Result<NormalizedQuote, ValidationError> {
        self.validate_at(payload, expected, Utc::now())
    }

    /// Validate a payload, stamping it with `observed_at`.
    ///
    /// The timestamp is the validation time, not the fetch time; the gap
    /// between the two is the fetch stage latency.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub fn validate_at(
        &self,
        payload: RawQuotePayload,
        expected: &Symbol,
        observed_at: DateTime<Utc>,
    ) -> Result<NormalizedQuote, ValidationError> {
        self.check_symbol(&payload, expected)?;

        let price = self.extract_price(&payload)?;
        if price <= Decimal::ZERO {
            return Err(ValidationError::ImplausibleValue { price });
        }

        NormalizedQuote::new(expected.clone(), price, observed_at)
    }

    fn check_symbol(
        &self,
        payload: &RawQuotePayload,
        expected: &Symbol,
    ) -> Result<(), ValidationError> {
        // Absent echo is tolerated; a different symbol is not.
        if let Some(Value::String(actual)) = payload.get(&self.symbol_field)
            && !actual.trim().eq_ignore_ascii_case(expected.as_str())
        {
            return Err(ValidationError::SymbolMismatch {
                expected: expected.to_string(),
                actual: actual.clone(),
            });
        }
        Ok(())
    }

    fn extract_price(&self, payload: &RawQuotePayload) -> Result<Decimal, ValidationError> {
        let raw = match payload.get(&self.price_field) {
            None | Some(Value::Null) => {
                return Err(ValidationError::MissingField {
                    field: self.price_field.clone(),
                });
            }
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => other.to_string(),
        };

        if raw.is_empty() {
            return Err(ValidationError::MissingField {
                field: self.price_field.clone(),
            });
        }

        // rust_decimal tolerates `_` separators; providers never send them.
        if !raw.chars().all(is_price_char) {
            return Err(ValidationError::MalformedNumber {
                field: self.price_field.clone(),
                raw,
            });
        }

        Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .map_err(|_| ValidationError::MalformedNumber {
                field: self.price_field.clone(),
                raw,
            })
    }
}

const fn is_price_char(c: char) -> bool {
    matches!(c, '0'..='9' | '+' | '-' | '.' | 'e' | 'E')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use test_case::test_case;

    fn acme() -> Symbol {
        Symbol::parse("ACME").unwrap()
    }

    fn payload_with_price(price: Value) -> RawQuotePayload {
        RawQuotePayload::from([("01. symbol", json!("ACME")), ("05. price", price)])
    }

    #[test]
    fn valid_payload_becomes_quote() {
        let now = Utc::now();
        let quote = QuoteValidator::default()
            .validate_at(payload_with_price(json!("123.4500")), &acme(), now)
            .unwrap();

        assert_eq!(quote.symbol(), &acme());
        assert_eq!(quote.price(), dec!(123.45));
        assert_eq!(quote.observed_at(), now);
    }

    #[test]
    fn numeric_json_price_accepted() {
        let quote = QuoteValidator::default()
            .validate(payload_with_price(json!(42.5)), &acme())
            .unwrap();
        assert_eq!(quote.price(), dec!(42.5));
    }

    #[test]
    fn missing_price_field() {
        let payload = RawQuotePayload::from([("01. symbol", json!("ACME"))]);
        let err = QuoteValidator::default()
            .validate(payload, &acme())
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "05. price".to_string()
            }
        );
    }

    #[test_case(json!(null) ; "null")]
    #[test_case(json!("") ; "empty string")]
    #[test_case(json!("   ") ; "blank string")]
    fn absent_price_values(price: Value) {
        let err = QuoteValidator::default()
            .validate(payload_with_price(price), &acme())
            .unwrap_err();
        assert_eq!(err.code(), "missing_field");
    }

    #[test_case(json!("abc") ; "letters")]
    #[test_case(json!("NaN") ; "nan")]
    #[test_case(json!("inf") ; "infinity")]
    #[test_case(json!("12.3.4") ; "two dots")]
    #[test_case(json!("1_000") ; "underscore separator")]
    #[test_case(json!("12_3.4_5") ; "underscores in fraction")]
    #[test_case(json!("1 000") ; "inner space")]
    #[test_case(json!(true) ; "boolean")]
    #[test_case(json!({"v": 1}) ; "object")]
    fn malformed_prices(price: Value) {
        let err = QuoteValidator::default()
            .validate(payload_with_price(price), &acme())
            .unwrap_err();
        assert_eq!(err.code(), "malformed_number");
    }

    #[test_case("0.00" ; "zero")]
    #[test_case("0" ; "bare zero")]
    #[test_case("-3.25" ; "negative")]
    fn implausible_prices(price: &str) {
        let err = QuoteValidator::default()
            .validate(payload_with_price(json!(price)), &acme())
            .unwrap_err();
        assert_eq!(err.code(), "implausible_value");
    }

    #[test]
    fn symbol_echo_must_match() {
        let payload =
            RawQuotePayload::from([("01. symbol", json!("OTHER")), ("05. price", json!("1.00"))]);
        let err = QuoteValidator::default()
            .validate(payload, &acme())
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::SymbolMismatch {
                expected: "ACME".to_string(),
                actual: "OTHER".to_string()
            }
        );
    }

    #[test]
    fn symbol_echo_is_case_insensitive_and_optional() {
        let validator = QuoteValidator::default();
        let lower =
            RawQuotePayload::from([("01. symbol", json!("acme")), ("05. price", json!("1.00"))]);
        assert!(validator.validate(lower, &acme()).is_ok());

        let no_echo = RawQuotePayload::from([("05. price", json!("1.00"))]);
        assert!(validator.validate(no_echo, &acme()).is_ok());
    }

    #[test]
    fn custom_field_names() {
        let validator = QuoteValidator::new("price", "symbol");
        let payload = RawQuotePayload::from([("symbol", json!("ACME")), ("price", json!("9.99"))]);
        assert_eq!(validator.validate(payload, &acme()).unwrap().price(), dec!(9.99));
    }

    proptest! {
        #[test]
        fn positive_prices_always_validate(cents in 1_i64..1_000_000_000) {
            let price = Decimal::new(cents, 2);
            let quote = QuoteValidator::default()
                .validate(payload_with_price(json!(price.to_string())), &acme())
                .unwrap();
            prop_assert_eq!(quote.price(), price.normalize());
        }

        #[test]
        fn non_positive_prices_never_validate(cents in -1_000_000_000_i64..=0) {
            let price = Decimal::new(cents, 2);
            let err = QuoteValidator::default()
                .validate(payload_with_price(json!(price.to_string())), &acme())
                .unwrap_err();
            prop_assert_eq!(err.code(), "implausible_value");
        }
    }
}
