//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `QuoteSourcePort`: single-attempt quote fetch from the upstream provider
//! - `BrokerSinkPort`: single-attempt record delivery to a broker topic

mod broker_sink;
mod quote_source;

pub use broker_sink::{Acknowledged, BrokerSinkPort, PublishRecord, SinkError};
pub use quote_source::{FetchError, QuoteSourcePort};

#[cfg(test)]
pub use broker_sink::MockBrokerSinkPort;
#[cfg(test)]
pub use quote_source::MockQuoteSourcePort;
