use std::fmt;
use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::runner::Simulation;

/// Module name used for the `modules.<name>.config` section.
pub const MODULE_NAME: &str = "loading_time";

/// Configuration for the `loading_time` module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadingTimeConfig {
    pub runner: RunnerConfig,
    pub callback: CallbackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub pool_size: usize,
    #[serde(with = "shipload_bootstrap::duration_serde")]
    pub delay_min: Duration,
    #[serde(with = "shipload_bootstrap::duration_serde")]
    pub delay_max: Duration,
    /// Chance that a successful calculation is reported as failed. Keep at `0.0` in production.
    pub failure_probability: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            pool_size: 2,
            delay_min: Duration::from_secs(5),
            delay_max: Duration::from_secs(10),
            failure_probability: 0.0,
        }
    }
}

impl RunnerConfig {
    #[must_use]
    pub fn simulation(&self) -> Simulation {
        Simulation::new(self.delay_min, self.delay_max, self.failure_probability)
    }
}

/// Body encoding expected by the receiving system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackFormat {
    /// `{"request_ship_id", "success", "loading_time" | "error_message"}`
    #[default]
    Json,
    /// `action=<action>&loading_time=..` or `action=<action>&error_message=..`
    Form,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CallbackConfig {
    pub base_url: Url,
    /// Shared secret sent as a bearer token. Never serialized.
    #[serde(skip_serializing, deserialize_with = "string_token")]
    pub token: Option<String>,
    #[serde(with = "shipload_bootstrap::duration_serde")]
    pub timeout: Duration,
    pub format: CallbackFormat,
    pub success_segment: String,
    pub failure_segment: String,
    pub success_action: String,
    pub failure_action: String,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout: Duration::from_secs(10),
            format: CallbackFormat::Json,
            success_segment: "loading-time-result".to_owned(),
            failure_segment: "loading-time-result".to_owned(),
            success_action: "complete".to_owned(),
            failure_action: "reject".to_owned(),
        }
    }
}

impl fmt::Debug for CallbackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("format", &self.format)
            .field("success_segment", &self.success_segment)
            .field("failure_segment", &self.failure_segment)
            .field("success_action", &self.success_action)
            .field("failure_action", &self.failure_action)
            .finish()
    }
}

#[allow(clippy::expect_used)]
fn default_base_url() -> Url {
    Url::parse("http://localhost:8080/api/request_ship").expect("static URL is valid")
}

/// Tokens must arrive as strings. Unquoted `APP__*` values that look numeric
/// are parsed as numbers, which drops leading zeros, so they are refused
/// instead of being converted back.
fn string_token<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(token)) => Ok(Some(token)),
        Some(_) => Err(D::Error::custom(TOKEN_NOT_STRING)),
    }
}

/// The offending value is left out so the secret never reaches logs.
pub const TOKEN_NOT_STRING: &str = "callback.token must be a string; \
     quote it (YAML: token: \"00123456\", env: APP__...__TOKEN='\"00123456\"')";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum LoadingTimeConfigError {
    #[error("runner.pool_size must be at least 1")]
    EmptyPool,
    #[error("runner.delay_min must not exceed runner.delay_max")]
    DelayRange { min: Duration, max: Duration },
    #[error("runner.failure_probability must be within [0, 1], got {0}")]
    FailureProbability(f64),
    #[error("callback.base_url '{0}' cannot carry path segments")]
    BaseUrl(String),
    #[error("callback.timeout must be greater than zero")]
    ZeroTimeout,
    #[error("callback.{0} must not be empty")]
    EmptyValue(&'static str),
}

impl LoadingTimeConfig {
    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), LoadingTimeConfigError> {
        let runner = &self.runner;
        if runner.pool_size == 0 {
            return Err(LoadingTimeConfigError::EmptyPool);
        }
        if runner.delay_min > runner.delay_max {
            return Err(LoadingTimeConfigError::DelayRange {
                min: runner.delay_min,
                max: runner.delay_max,
            });
        }
        if !(0.0..=1.0).contains(&runner.failure_probability) {
            return Err(LoadingTimeConfigError::FailureProbability(
                runner.failure_probability,
            ));
        }

        let callback = &self.callback;
        if callback.base_url.cannot_be_a_base() {
            return Err(LoadingTimeConfigError::BaseUrl(
                callback.base_url.to_string(),
            ));
        }
        if callback.timeout.is_zero() {
            return Err(LoadingTimeConfigError::ZeroTimeout);
        }
        for (name, value) in [
            ("success_segment", &callback.success_segment),
            ("failure_segment", &callback.failure_segment),
            ("success_action", &callback.success_action),
            ("failure_action", &callback.failure_action),
        ] {
            if value.trim().is_empty() {
                return Err(LoadingTimeConfigError::EmptyValue(name));
            }
        }
        Ok(())
    }
}
