//! Ticker symbol parsing.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Longest ticker accepted, in characters.
pub const MAX_SYMBOL_LEN: usize = 12;

#[allow(clippy::expect_used)]
static SYMBOL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9][A-Z0-9.\-]{0,11}$").expect("static symbol pattern is valid")
});

/// Exchange ticker symbol requested by a caller.
///
/// Always non-empty, upper-case, at most [`MAX_SYMBOL_LEN`] characters of
/// letters, digits, dots and dashes (`BRK.B`, `BRK-B`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    /// Parse caller input into a symbol.
    ///
    /// Surrounding whitespace is ignored and the input is upper-cased.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolError`] if the input is empty, too long, or contains
    /// characters outside the ticker alphabet.
    pub fn parse(input: &str) -> Result<Self, SymbolError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SymbolError::Empty);
        }

        let len = trimmed.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(SymbolError::TooLong { len });
        }

        let upper = trimmed.to_uppercase();
        if !SYMBOL_PATTERN.is_match(&upper) {
            return Err(SymbolError::InvalidCharacters(trimmed.to_string()));
        }

        Ok(Self(upper))
    }

    /// The symbol text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The symbol as raw UTF-8 bytes, used as the broker record key.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Rejected symbol input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolError {
    /// Nothing but whitespace was supplied.
    #[error("symbol cannot be empty")]
    Empty,
    /// More characters than any exchange ticker.
    #[error("symbol is {len} characters long, maximum is {MAX_SYMBOL_LEN}")]
    TooLong {
        /// Length of the rejected input.
        len: usize,
    },
    /// Characters outside letters, digits, dots and dashes.
    #[error("symbol contains invalid characters: {0:?}")]
    InvalidCharacters(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("ACME", "ACME" ; "plain")]
    #[test_case("acme", "ACME" ; "lower case")]
    #[test_case("  ibm ", "IBM" ; "surrounding whitespace")]
    #[test_case("BRK.B", "BRK.B" ; "share class dot")]
    #[test_case("brk-b", "BRK-B" ; "share class dash")]
    #[test_case("7203.T", "7203.T" ; "numeric with exchange suffix")]
    fn parses_valid_symbols(input: &str, expected: &str) {
        assert_eq!(Symbol::parse(input).unwrap().as_str(), expected);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(Symbol::parse(""), Err(SymbolError::Empty));
        assert_eq!(Symbol::parse("   "), Err(SymbolError::Empty));
    }

    #[test]
    fn rejects_too_long() {
        assert_eq!(
            Symbol::parse("ABCDEFGHIJKLM"),
            Err(SymbolError::TooLong { len: 13 })
        );
        assert!(Symbol::parse("ABCDEFGHIJKL").is_ok());
    }

    #[test_case("AC ME" ; "inner space")]
    #[test_case("ACME$" ; "dollar")]
    #[test_case(".ACME" ; "leading dot")]
    #[test_case("AC/ME" ; "slash")]
    #[test_case("ÄCME" ; "non ascii")]
    fn rejects_invalid_characters(input: &str) {
        assert!(matches!(
            Symbol::parse(input),
            Err(SymbolError::InvalidCharacters(_))
        ));
    }

    #[test]
    fn key_bytes_are_symbol_text() {
        let symbol = Symbol::parse("acme").unwrap();
        assert_eq!(symbol.as_bytes(), b"ACME");
        assert_eq!(symbol.to_string(), "ACME");
    }

    proptest! {
        #[test]
        fn parsed_symbols_are_upper_case_and_bounded(input in "[a-zA-Z0-9][a-zA-Z0-9.-]{0,11}") {
            let symbol = Symbol::parse(&input).unwrap();
            prop_assert_eq!(symbol.as_str(), input.to_uppercase());
            prop_assert!(symbol.as_str().len() <= MAX_SYMBOL_LEN);
        }

        #[test]
        fn parsing_is_idempotent(input in "[A-Z0-9][A-Z0-9.-]{0,11}") {
            let once = Symbol::parse(&input).unwrap();
            let twice = Symbol::parse(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
