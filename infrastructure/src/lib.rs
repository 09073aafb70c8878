//! Infrastructure layer for roundtable
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer:
//!
//! - [`providers`]: OpenAI and Anthropic HTTP adapters behind a
//!   [`RoutingGateway`](providers::routing::RoutingGateway)
//! - [`storage`]: JSON file session store
//! - [`logging`]: JSONL telemetry sink
//! - [`config`]: TOML configuration loading and validation

pub mod config;
pub mod logging;
pub mod providers;
pub mod storage;

pub use config::{ConfigError, ConfigLoader, FileConfig};
pub use logging::JsonlTelemetrySink;
pub use providers::{
    ProviderAdapter, anthropic::AnthropicProvider, gateway_from_config, map_status,
    openai::OpenAiProvider, routing::RoutingGateway,
};
pub use storage::{JsonFileSessionStore, StorageHealth};
