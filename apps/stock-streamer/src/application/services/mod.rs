//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `Publisher`: delivers validated quotes to the broker with bounded retry
//! - `IngestionPipeline`: fetch → validate → publish for one symbol request

/// Exponential backoff shared by the retry loops.
pub mod backoff;

/// Fetch → validate → publish orchestration.
pub mod pipeline;

/// Broker delivery with confirmation and bounded retry.
pub mod publisher;

pub use backoff::{BackoffConfig, BackoffPolicy};
pub use pipeline::{IngestionPipeline, PipelineConfig, PipelineError, PipelineOutcome, PipelineStage};
pub use publisher::{PublishError, Publisher, PublisherConfig};
