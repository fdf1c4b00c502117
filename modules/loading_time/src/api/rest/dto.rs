use serde::{Deserialize, Serialize};

use crate::domain::{CalculationRequest, CraneRecord, IntakeVariant, RequestId};
use crate::runner::RunnerStats;

/// Acknowledgement text returned once work is queued.
pub const ACK_MESSAGE: &str = "loading time calculation started";

/// Fields that must be present for `POST /api/async/loading-time`, checked in order.
pub const LOADING_TIME_REQUIRED: &[&str] =
    &["request_ship_id", "containers_20ft", "containers_40ft", "ships"];

/// Fields that must be present for `POST /api/async/set-status`.
pub const SET_STATUS_REQUIRED: &[&str] = &["pk"];

/// Full estimation request.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadingTimeRequestDto {
    pub request_ship_id: RequestId,
    pub containers_20ft: u32,
    pub containers_40ft: u32,
    pub ships: Vec<CraneRecord>,
}

impl From<LoadingTimeRequestDto> for CalculationRequest {
    fn from(dto: LoadingTimeRequestDto) -> Self {
        Self {
            request_ship_id: dto.request_ship_id,
            containers_20ft: dto.containers_20ft,
            containers_40ft: dto.containers_40ft,
            ships: Some(dto.ships),
            variant: IntakeVariant::LoadingTime,
        }
    }
}

/// Status update keyed by the request's primary key.
#[derive(Debug, Clone, Deserialize)]
pub struct SetStatusRequestDto {
    pub pk: RequestId,
    #[serde(default)]
    pub containers_20ft: u32,
    #[serde(default)]
    pub containers_40ft: u32,
    #[serde(default)]
    pub ships: Option<Vec<CraneRecord>>,
}

impl From<SetStatusRequestDto> for CalculationRequest {
    fn from(dto: SetStatusRequestDto) -> Self {
        Self {
            request_ship_id: dto.pk,
            containers_20ft: dto.containers_20ft,
            containers_40ft: dto.containers_40ft,
            ships: dto.ships,
            variant: IntakeVariant::StatusUpdate,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AckResponse {
    pub message: &'static str,
}

impl AckResponse {
    #[must_use]
    pub fn started() -> Self {
        Self {
            message: ACK_MESSAGE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub runner: RunnerStats,
}
