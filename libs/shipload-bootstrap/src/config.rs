//! Layered application configuration.
//!
//! Sources are merged in this order (later wins):
//! 1. built-in defaults
//! 2. YAML file passed with `--config`
//! 3. environment variables prefixed with `APP__` (`__` separates nesting levels)
//! 4. CLI overrides (`--port`, `-v`)
//!
//! Module sections stay raw JSON under `modules.<name>.config`; every module
//! parses its own section with [`module_config_or_default`].

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Environment prefix for configuration overrides.
pub const ENV_PREFIX: &str = "APP__";

/// Configuration errors raised while loading or reading sections.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config file does not exist: {path}")]
    FileNotFound { path: PathBuf },
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid bind address '{addr}': {source}")]
    InvalidBindAddr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("invalid config for module '{module}': {source}")]
    InvalidModuleConfig {
        module: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to render configuration: {0}")]
    Render(String),
}

/// Arguments from the command line that feed into the config merge.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub port: Option<u16>,
    pub verbose: u8,
}

/// Whole-process configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub modules: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Upper bound for draining queued work after a shutdown signal.
    #[serde(with = "crate::duration_serde")]
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_owned(),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// # Errors
    /// Returns [`ConfigError::InvalidBindAddr`] when `bind_addr` is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                addr: self.bind_addr.clone(),
                source,
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. `info`, `loading_time=debug`).
    pub level: String,
    pub format: LogFormat,
    /// Optional log file; console output is always enabled.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load defaults, then the optional YAML file, then `APP__*` environment overrides.
    ///
    /// # Errors
    /// Returns an error if the file is missing or any layer fails to deserialize.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Apply command-line overrides on top of the loaded layers.
    ///
    /// # Errors
    /// Returns an error if the port override cannot be applied to `server.bind_addr`.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) -> Result<(), ConfigError> {
        if let Some(port) = args.port {
            let mut addr = self.server.socket_addr()?;
            addr.set_port(port);
            self.server.bind_addr = addr.to_string();
        }

        match args.verbose {
            0 => {}
            1 => "info".clone_into(&mut self.logging.level),
            2 => "debug".clone_into(&mut self.logging.level),
            _ => "trace".clone_into(&mut self.logging.level),
        }

        Ok(())
    }

    /// Render the effective configuration as YAML.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_saphyr::to_string(self).map_err(|e| ConfigError::Render(e.to_string()))
    }
}

/// Read `modules.<name>.config` into `T`, falling back to `T::default()`.
///
/// - module absent, not an object, or without a `config` key -> `Ok(T::default())`
/// - `config` present but malformed -> `Err(ConfigError::InvalidModuleConfig)`
///
/// # Errors
/// Returns [`ConfigError::InvalidModuleConfig`] when the section cannot be deserialized.
pub fn module_config_or_default<T>(config: &AppConfig, module_name: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let Some(section) = config
        .modules
        .get(module_name)
        .and_then(serde_json::Value::as_object)
        .and_then(|obj| obj.get("config"))
    else {
        return Ok(T::default());
    };

    serde_json::from_value(section.clone()).map_err(|source| ConfigError::InvalidModuleConfig {
        module: module_name.to_owned(),
        source,
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Probe {
        #[serde(default)]
        size: usize,
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.bind_addr, "0.0.0.0:8000");
        assert_eq!(cfg.server.shutdown_grace, Duration::from_secs(30));
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.modules.is_empty());
    }

    #[test]
    fn port_override_keeps_host() {
        let mut cfg = AppConfig::default();
        cfg.server.bind_addr = "127.0.0.1:8000".to_owned();
        cfg.apply_cli_overrides(&CliArgs {
            port: Some(9100),
            ..CliArgs::default()
        })
        .unwrap();
        assert_eq!(cfg.server.bind_addr, "127.0.0.1:9100");
    }

    #[test]
    fn verbosity_maps_to_level() {
        let mut cfg = AppConfig::default();
        cfg.apply_cli_overrides(&CliArgs {
            verbose: 2,
            ..CliArgs::default()
        })
        .unwrap();
        assert_eq!(cfg.logging.level, "debug");

        cfg.apply_cli_overrides(&CliArgs {
            verbose: 5,
            ..CliArgs::default()
        })
        .unwrap();
        assert_eq!(cfg.logging.level, "trace");
    }

    #[test]
    fn bad_bind_addr_is_reported() {
        let mut cfg = AppConfig::default();
        cfg.server.bind_addr = "not-an-addr".to_owned();
        let err = cfg
            .apply_cli_overrides(&CliArgs {
                port: Some(1),
                ..CliArgs::default()
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
    }

    #[test]
    fn module_config_falls_back_to_default() {
        let mut cfg = AppConfig::default();
        assert_eq!(module_config_or_default::<Probe>(&cfg, "x").unwrap(), Probe::default());

        cfg.modules
            .insert("x".to_owned(), serde_json::json!({ "other": 1 }));
        assert_eq!(module_config_or_default::<Probe>(&cfg, "x").unwrap(), Probe::default());

        cfg.modules
            .insert("x".to_owned(), serde_json::json!({ "config": { "size": 3 } }));
        assert_eq!(
            module_config_or_default::<Probe>(&cfg, "x").unwrap(),
            Probe { size: 3 }
        );
    }

    #[test]
    fn malformed_module_config_is_an_error() {
        let mut cfg = AppConfig::default();
        cfg.modules.insert(
            "x".to_owned(),
            serde_json::json!({ "config": { "size": "lots" } }),
        );
        let err = module_config_or_default::<Probe>(&cfg, "x").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidModuleConfig { module, .. } if module == "x"));
    }
}
