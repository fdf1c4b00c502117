#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Ship loading-time calculation module.
//!
//! Requests are acknowledged immediately; the estimate is computed on a
//! bounded worker pool and reported back to the ship request system through
//! an outbound HTTP callback.
//!
//! ## Layers
//!
//! - [`domain`]: request/result model, the loading-time formula, the service
//! - [`runner`]: worker pool, task handles, simulated latency and faults
//! - [`infra`]: callback dispatcher (outbound HTTP)
//! - [`api`]: REST handlers and routes
//! - [`module`]: wiring from configuration

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;
pub mod module;
pub mod runner;

pub use config::{CallbackConfig, CallbackFormat, LoadingTimeConfig, RunnerConfig};
pub use module::LoadingTimeModule;
