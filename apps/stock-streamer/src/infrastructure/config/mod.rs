//! Configuration Module
//!
//! Configuration loading for the service. Read once at startup and never
//! mutated afterwards.

mod settings;

pub use settings::{
    BrokerMode, BrokerSettings, ConfigError, PipelineSettings, ProviderSettings, ServerSettings,
    ServiceConfig,
};
