#![allow(clippy::unwrap_used, clippy::expect_used)]

//! `loading_time` settings supplied through `APP__*` environment variables.

use shipload_bootstrap::{AppConfig, ConfigError, module_config_or_default};

use loading_time::LoadingTimeConfig;
use loading_time::config::{MODULE_NAME, TOKEN_NOT_STRING};

const TOKEN_VAR: &str = "APP__MODULES__LOADING_TIME__CONFIG__CALLBACK__TOKEN";

fn load_with_token(value: &str) -> Result<LoadingTimeConfig, ConfigError> {
    let app = temp_env::with_vars([(TOKEN_VAR, Some(value))], || {
        AppConfig::load_or_default(None).unwrap()
    });
    module_config_or_default(&app, MODULE_NAME)
}

#[test]
fn unquoted_numeric_token_is_rejected_instead_of_rewritten() {
    let err = load_with_token("00123456").unwrap_err();

    assert!(matches!(err, ConfigError::InvalidModuleConfig { .. }));
    let message = err.to_string();
    assert!(message.contains(TOKEN_NOT_STRING), "{message}");
}

#[test]
fn quoted_numeric_token_keeps_every_digit() {
    let cfg = load_with_token("\"00123456\"").unwrap();
    assert_eq!(cfg.callback.token.as_deref(), Some("00123456"));
}

#[test]
fn plain_text_token_is_taken_as_is() {
    let cfg = load_with_token("abc-00123").unwrap();
    assert_eq!(cfg.callback.token.as_deref(), Some("abc-00123"));
}
