//! Outbound result notification to the ship request system.

use async_trait::async_trait;
use http::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::config::{CallbackConfig, CallbackFormat};
use crate::domain::{CalculationResult, CompletionObserver, Outcome, RequestId};

/// Longest response body excerpt kept in a [`DeliveryError::Status`].
const BODY_EXCERPT_LIMIT: usize = 512;

#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("result has no usable request identifier")]
    MissingIdentifier,

    #[error("callback base URL '{0}' cannot carry path segments")]
    InvalidBaseUrl(String),

    #[error("failed to build callback client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("callback request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("callback rejected with HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Serialize)]
struct JsonBody<'a> {
    request_ship_id: &'a RequestId,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    loading_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
}

/// Sends one POST per completed work item. Stateless apart from its
/// configuration; failures are logged and dropped.
pub struct CallbackDispatcher {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    format: CallbackFormat,
    success_segment: String,
    failure_segment: String,
    success_action: String,
    failure_action: String,
}

impl CallbackDispatcher {
    /// # Errors
    /// Fails if the base URL cannot be extended or the HTTP client cannot be built.
    pub fn new(cfg: &CallbackConfig) -> Result<Self, DeliveryError> {
        if cfg.base_url.cannot_be_a_base() {
            return Err(DeliveryError::InvalidBaseUrl(cfg.base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(DeliveryError::Client)?;

        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            token: cfg.token.clone().map(SecretString::from),
            format: cfg.format,
            success_segment: cfg.success_segment.clone(),
            failure_segment: cfg.failure_segment.clone(),
            success_action: cfg.success_action.clone(),
            failure_action: cfg.failure_action.clone(),
        })
    }

    /// `{base_url}/{request_ship_id}/{segment}`, segment chosen by outcome.
    ///
    /// # Errors
    /// Returns [`DeliveryError::MissingIdentifier`] for a blank identifier.
    pub fn endpoint(&self, result: &CalculationResult) -> Result<Url, DeliveryError> {
        if result.request_ship_id.is_blank() {
            return Err(DeliveryError::MissingIdentifier);
        }
        let segment = if result.is_success() {
            &self.success_segment
        } else {
            &self.failure_segment
        };

        let id = result.request_ship_id.to_string();
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| DeliveryError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([id.as_str(), segment.as_str()]);
        Ok(url)
    }

    /// Deliver one result. A single attempt, bounded by the configured timeout.
    ///
    /// # Errors
    /// Any failure to reach the endpoint or a non-2xx answer.
    #[instrument(skip_all, fields(request_ship_id = %result.request_ship_id, success = result.is_success()))]
    pub async fn deliver(&self, result: &CalculationResult) -> Result<StatusCode, DeliveryError> {
        let url = self.endpoint(result)?;

        let mut request = self.client.post(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }
        request = match self.format {
            CallbackFormat::Json => request.json(&json_body(result)),
            CallbackFormat::Form => request.form(&self.form_body(result)),
        };

        let response = request.send().await.map_err(|e| {
            if e.is_builder() {
                DeliveryError::Client(e)
            } else {
                DeliveryError::Network(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status,
                body: excerpt(&body),
            });
        }

        info!(%url, %status, "callback delivered");
        Ok(status)
    }

    fn form_body(&self, result: &CalculationResult) -> Vec<(&'static str, String)> {
        match &result.outcome {
            Outcome::Success { loading_time } => vec![
                ("action", self.success_action.clone()),
                ("loading_time", loading_time.to_string()),
            ],
            Outcome::Failure { error_message } => vec![
                ("action", self.failure_action.clone()),
                ("error_message", error_message.clone()),
            ],
        }
    }
}

fn json_body(result: &CalculationResult) -> JsonBody<'_> {
    JsonBody {
        request_ship_id: &result.request_ship_id,
        success: result.is_success(),
        loading_time: result.loading_time(),
        error_message: result.error_message(),
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT_LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_owned(),
    }
}

#[async_trait]
impl CompletionObserver for CallbackDispatcher {
    async fn on_complete(&self, result: &CalculationResult) {
        match self.deliver(result).await {
            Ok(_) => {}
            Err(DeliveryError::MissingIdentifier) => {
                warn!("skipping callback: {}", DeliveryError::MissingIdentifier);
            }
            Err(e) => {
                error!(
                    request_ship_id = %result.request_ship_id,
                    error = %e,
                    "failed to deliver loading time result"
                );
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn dispatcher(base: &str) -> CallbackDispatcher {
        let cfg = CallbackConfig {
            base_url: Url::parse(base).unwrap(),
            ..CallbackConfig::default()
        };
        CallbackDispatcher::new(&cfg).unwrap()
    }

    #[test]
    fn endpoint_handles_trailing_slash() {
        let result = CalculationResult::success(RequestId::numeric(7), 1.0);
        for base in [
            "http://backend/api/request_ship",
            "http://backend/api/request_ship/",
        ] {
            assert_eq!(
                dispatcher(base).endpoint(&result).unwrap().as_str(),
                "http://backend/api/request_ship/7/loading-time-result"
            );
        }
    }

    #[test]
    fn endpoint_escapes_identifier() {
        let result = CalculationResult::failure(RequestId::from("a/b c"), "x");
        let url = dispatcher("http://backend/base").endpoint(&result).unwrap();
        assert_eq!(url.path(), "/base/a%2Fb%20c/loading-time-result");
    }

    #[test]
    fn blank_identifier_has_no_endpoint() {
        let result = CalculationResult::failure(RequestId::from(""), "x");
        assert!(matches!(
            dispatcher("http://backend").endpoint(&result),
            Err(DeliveryError::MissingIdentifier)
        ));
    }

    #[test]
    fn json_body_shape() {
        let ok = CalculationResult::success(RequestId::numeric(5), 4.375);
        assert_eq!(
            serde_json::to_value(json_body(&ok)).unwrap(),
            serde_json::json!({ "request_ship_id": 5, "success": true, "loading_time": 4.375 })
        );

        let failed = CalculationResult::failure(RequestId::from("R-1"), "invalid input data");
        assert_eq!(
            serde_json::to_value(json_body(&failed)).unwrap(),
            serde_json::json!({
                "request_ship_id": "R-1",
                "success": false,
                "error_message": "invalid input data"
            })
        );
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn observer_logs_failed_delivery() {
        dispatcher("http://127.0.0.1:1/api")
            .on_complete(&CalculationResult::success(RequestId::numeric(9), 1.0))
            .await;
        assert!(logs_contain("failed to deliver loading time result"));
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let long = "x".repeat(BODY_EXCERPT_LIMIT + 10);
        let cut = excerpt(&long);
        assert_eq!(cut.len(), BODY_EXCERPT_LIMIT + 3);
        assert_eq!(excerpt("short"), "short");
    }
}
