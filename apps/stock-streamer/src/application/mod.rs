//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the ingestion pipeline and the port interfaces
//! that define how it reaches the quote provider and the broker.

/// Port interfaces for external systems (quote source, broker sink).
pub mod ports;

/// Publisher and ingestion pipeline.
pub mod services;
