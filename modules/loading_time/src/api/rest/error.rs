//! REST error mapping for the loading time module.
//!
//! Every error renders as `{"error": "<message>"}`, the body shape the ship
//! request system already parses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

use super::dto::ErrorBody;
use crate::domain::DomainError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{0}")]
    InvalidPayload(String),
}

impl ApiError {
    /// `"<field> is required"`
    #[must_use]
    pub fn missing_field(field: &str) -> Self {
        Self::Domain(DomainError::validation(field, "is required"))
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Domain(DomainError::Validation { .. }) | Self::InvalidPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Domain(DomainError::Unavailable) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Domain(DomainError::Validation { field, message }) => format!("{field} {message}"),
            Self::Domain(e @ DomainError::Unavailable) => e.to_string(),
            Self::InvalidPayload(message) => message.clone(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidPayload(rejection.body_text())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidPayload(format!("invalid request body: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request rejected");
        } else {
            tracing::debug!(error = %self, "invalid request");
        }
        (status, Json(ErrorBody { error: self.message() })).into_response()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message() {
        let e = ApiError::missing_field("ships");
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.message(), "ships is required");
    }

    #[test]
    fn closed_runner_is_unavailable() {
        let e = ApiError::from(DomainError::Unavailable);
        assert_eq!(e.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
