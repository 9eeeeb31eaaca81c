//! Validated quote.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::Symbol;
use super::validator::ValidationError;

/// A single validated price observation for one symbol.
///
/// Immutable once built. The price is finite, non-negative and normalized
/// (`123.4500` is stored as `123.45`) so that equal prices always encode to
/// equal bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuote {
    symbol: Symbol,
    price: Decimal,
    observed_at: DateTime<Utc>,
}

impl NormalizedQuote {
    /// Build a quote.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ImplausibleValue`] for a negative price.
    pub fn new(
        symbol: Symbol,
        price: Decimal,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if price.is_sign_negative() && !price.is_zero() {
            return Err(ValidationError::ImplausibleValue { price });
        }

        Ok(Self {
            symbol,
            price: price.normalize(),
            observed_at,
        })
    }

    /// Symbol this quote was requested for.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Quoted price.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// When the quote was validated.
    #[must_use]
    pub const fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn acme() -> Symbol {
        Symbol::parse("ACME").unwrap()
    }

    #[test]
    fn price_is_normalized() {
        let quote = NormalizedQuote::new(acme(), dec!(123.4500), Utc::now()).unwrap();
        assert_eq!(quote.price().to_string(), "123.45");
    }

    #[test]
    fn negative_price_rejected() {
        let err = NormalizedQuote::new(acme(), dec!(-1.5), Utc::now()).unwrap_err();
        assert_eq!(err, ValidationError::ImplausibleValue { price: dec!(-1.5) });
    }

    #[test]
    fn zero_price_is_representable() {
        let quote = NormalizedQuote::new(acme(), dec!(0.00), Utc::now()).unwrap();
        assert!(quote.price().is_zero());
    }
}
