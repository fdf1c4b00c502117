#![allow(clippy::unused_async)]

use std::sync::Arc;

use axum::Json;
use axum::extract::Extension;
use axum::extract::rejection::JsonRejection;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::dto::{
    AckResponse, HealthResponse, LOADING_TIME_REQUIRED, LoadingTimeRequestDto, SET_STATUS_REQUIRED,
    SetStatusRequestDto,
};
use super::error::{ApiError, ApiResult};
use crate::domain::{CalculationRequest, LoadingTimeService};

/// `POST /api/async/loading-time`
pub async fn start_loading_time(
    Extension(svc): Extension<Arc<LoadingTimeService>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<AckResponse>> {
    let dto: LoadingTimeRequestDto = parse(body, LOADING_TIME_REQUIRED)?;
    accept(&svc, dto.into())
}

/// `POST /api/async/set-status`
pub async fn set_status(
    Extension(svc): Extension<Arc<LoadingTimeService>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<AckResponse>> {
    let dto: SetStatusRequestDto = parse(body, SET_STATUS_REQUIRED)?;
    accept(&svc, dto.into())
}

pub async fn health(Extension(svc): Extension<Arc<LoadingTimeService>>) -> Json<HealthResponse> {
    let status = if svc.runner().is_closed() {
        "draining"
    } else {
        "healthy"
    };
    Json(HealthResponse {
        status,
        runner: svc.stats(),
    })
}

pub async fn healthz() -> &'static str {
    "ok"
}

fn accept(svc: &LoadingTimeService, request: CalculationRequest) -> ApiResult<Json<AckResponse>> {
    svc.schedule(request)?;
    Ok(Json(AckResponse::started()))
}

/// Presence check first, so a missing field is reported by name before any
/// type error; `null` counts as missing.
fn parse<T: DeserializeOwned>(
    body: Result<Json<Value>, JsonRejection>,
    required: &[&str],
) -> ApiResult<T> {
    let Json(body) = body?;
    let Some(object) = body.as_object() else {
        return Err(ApiError::InvalidPayload(
            "request body must be a JSON object".to_owned(),
        ));
    };

    if let Some(field) = required
        .iter()
        .find(|field| object.get(**field).is_none_or(Value::is_null))
    {
        return Err(ApiError::missing_field(field));
    }

    Ok(serde_json::from_value(body)?)
}
