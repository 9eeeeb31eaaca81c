//! Domain Layer - Quote types and validation rules.
//!
//! This layer contains the core types of the ingestion pipeline with no
//! I/O. Everything here is pure Rust with serialization support.

/// Symbols, quotes, validation and the broker wire format.
pub mod quote;
