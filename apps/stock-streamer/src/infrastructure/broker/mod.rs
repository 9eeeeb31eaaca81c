//! Broker Sink Adapters
//!
//! Implementations of `BrokerSinkPort`:
//!
//! - `kafka_rest`: Kafka REST Proxy v2 produce API
//! - `in_memory`: recording sink for tests and broker-less local runs

mod in_memory;
mod kafka_rest;

pub use in_memory::RecordingSink;
pub use kafka_rest::KafkaRestSink;
