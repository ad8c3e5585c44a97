//! Shared utilities: configuration loading and logging setup.

pub mod config;
pub mod logging;

pub use config::{AgentDefaults, ConfigError, ProctorConfig};
pub use logging::{init_json_logging, init_logging};
