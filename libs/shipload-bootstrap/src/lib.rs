#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Host bootstrap for shipload services.
//!
//! ## Modules
//!
//! - [`config`]: layered application configuration (defaults, YAML, env, CLI)
//! - [`logging`]: `tracing` subscriber setup for console and optional file output
//! - [`signals`]: waiting for process termination signals
//! - [`duration_serde`]: humantime (de)serialization for `Duration` fields

pub mod config;
pub mod duration_serde;
pub mod logging;
pub mod signals;

pub use config::{
    AppConfig, CliArgs, ConfigError, LogFormat, LoggingConfig, ServerConfig,
    module_config_or_default,
};
pub use logging::{LoggingGuard, init_logging};
pub use signals::wait_for_shutdown;
