use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque request/ship identifier supplied by the caller.
///
/// The upstream system sends either numbers or strings; whichever shape arrives is
/// kept so callbacks echo the identifier back exactly as received. Any JSON
/// number is accepted, including ids past `i64::MAX` and floats such as `12.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Numeric(serde_json::Number),
    Text(String),
}

impl RequestId {
    #[must_use]
    pub fn numeric(value: i64) -> Self {
        Self::Numeric(value.into())
    }

    /// An identifier that cannot be used to address a callback: empty or
    /// whitespace-only text, or the number zero.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Numeric(n) => n.as_f64().is_some_and(|v| v == 0.0),
            Self::Text(s) => s.trim().is_empty(),
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::numeric(value)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Crane capacity of one ship type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraneRecord {
    #[serde(default)]
    pub ship_id: Option<RequestId>,
    #[serde(default)]
    pub cranes: u32,
    /// How many ships of this type take part.
    #[serde(default)]
    pub ships_count: u32,
}

impl CraneRecord {
    #[must_use]
    pub fn new(cranes: u32, ships_count: u32) -> Self {
        Self {
            ship_id: None,
            cranes,
            ships_count,
        }
    }
}

/// Which inbound contract produced the request; decides what the task itself requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeVariant {
    /// Full estimation request: crane data is mandatory.
    LoadingTime,
    /// Status update keyed by `pk`: container and crane data are optional.
    StatusUpdate,
}

impl IntakeVariant {
    #[must_use]
    pub fn requires_crane_data(self) -> bool {
        matches!(self, Self::LoadingTime)
    }
}

/// A submitted calculation. Immutable once handed to the runner.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationRequest {
    pub request_ship_id: RequestId,
    pub containers_20ft: u32,
    pub containers_40ft: u32,
    pub ships: Option<Vec<CraneRecord>>,
    pub variant: IntakeVariant,
}

/// Inputs that passed task-level validation.
#[derive(Debug, Clone, Copy)]
pub struct CalculationInput<'a> {
    pub containers_20ft: u32,
    pub containers_40ft: u32,
    pub ships: &'a [CraneRecord],
}

impl CalculationRequest {
    /// Task-level validation: a usable identifier, plus crane data when the variant needs it.
    #[must_use]
    pub fn validated(&self) -> Option<CalculationInput<'_>> {
        if self.request_ship_id.is_blank() {
            return None;
        }

        let ships = self.ships.as_deref().unwrap_or_default();
        if self.variant.requires_crane_data() && ships.is_empty() {
            return None;
        }

        Some(CalculationInput {
            containers_20ft: self.containers_20ft,
            containers_40ft: self.containers_40ft,
            ships,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success { loading_time: f64 },
    Failure { error_message: String },
}

/// Outcome of exactly one work item.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationResult {
    pub request_ship_id: RequestId,
    pub outcome: Outcome,
}

impl CalculationResult {
    #[must_use]
    pub fn success(request_ship_id: RequestId, loading_time: f64) -> Self {
        Self {
            request_ship_id,
            outcome: Outcome::Success { loading_time },
        }
    }

    pub fn failure(request_ship_id: RequestId, error_message: impl Into<String>) -> Self {
        Self {
            request_ship_id,
            outcome: Outcome::Failure {
                error_message: error_message.into(),
            },
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    #[must_use]
    pub fn loading_time(&self) -> Option<f64> {
        match self.outcome {
            Outcome::Success { loading_time } => Some(loading_time),
            Outcome::Failure { .. } => None,
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure { error_message } => Some(error_message),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn request(id: RequestId, ships: Option<Vec<CraneRecord>>, variant: IntakeVariant) -> CalculationRequest {
        CalculationRequest {
            request_ship_id: id,
            containers_20ft: 1,
            containers_40ft: 1,
            ships,
            variant,
        }
    }

    #[test]
    fn request_id_keeps_json_shape() {
        let numeric: RequestId = serde_json::from_str("42").unwrap();
        let text: RequestId = serde_json::from_str("\"REQ-7\"").unwrap();
        assert_eq!(numeric, RequestId::numeric(42));
        assert_eq!(text, RequestId::from("REQ-7"));
        assert_eq!(serde_json::to_string(&numeric).unwrap(), "42");
        assert_eq!(numeric.to_string(), "42");
    }

    #[test]
    fn blank_ids() {
        assert!(RequestId::from("  ").is_blank());
        assert!(!RequestId::from("a").is_blank());
        assert!(RequestId::numeric(0).is_blank());
        assert!(RequestId::Numeric(serde_json::Number::from_f64(0.0).unwrap()).is_blank());
        assert!(!RequestId::numeric(-1).is_blank());
    }

    #[test]
    fn request_id_accepts_any_json_number() {
        let big: RequestId = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(serde_json::to_string(&big).unwrap(), "18446744073709551615");
        assert_eq!(big.to_string(), "18446744073709551615");

        let float: RequestId = serde_json::from_str("12.0").unwrap();
        assert_eq!(serde_json::to_string(&float).unwrap(), "12.0");
        assert_eq!(float.to_string(), "12.0");
        assert!(!float.is_blank());
    }

    #[test]
    fn loading_time_variant_needs_ships() {
        let r = request(RequestId::numeric(1), Some(vec![]), IntakeVariant::LoadingTime);
        assert!(r.validated().is_none());

        let r = request(RequestId::numeric(1), None, IntakeVariant::LoadingTime);
        assert!(r.validated().is_none());

        let r = request(
            RequestId::numeric(1),
            Some(vec![CraneRecord::new(2, 1)]),
            IntakeVariant::LoadingTime,
        );
        assert_eq!(r.validated().unwrap().ships.len(), 1);
    }

    #[test]
    fn status_update_variant_accepts_missing_ships() {
        let r = request(RequestId::from("9"), None, IntakeVariant::StatusUpdate);
        let input = r.validated().unwrap();
        assert!(input.ships.is_empty());
    }

    #[test]
    fn blank_id_never_validates() {
        let r = request(RequestId::from(""), Some(vec![CraneRecord::new(1, 1)]), IntakeVariant::LoadingTime);
        assert!(r.validated().is_none());
    }

    #[test]
    fn crane_record_fields_default_to_zero() {
        let rec: CraneRecord = serde_json::from_str(r#"{"ship_id": 3}"#).unwrap();
        assert_eq!(rec.cranes, 0);
        assert_eq!(rec.ships_count, 0);
        assert_eq!(rec.ship_id, Some(RequestId::numeric(3)));
    }

    #[test]
    fn result_accessors() {
        let ok = CalculationResult::success(RequestId::numeric(1), 2.5);
        assert!(ok.is_success());
        assert_eq!(ok.loading_time(), Some(2.5));
        assert_eq!(ok.error_message(), None);

        let failed = CalculationResult::failure(RequestId::numeric(1), "boom");
        assert!(!failed.is_success());
        assert_eq!(failed.loading_time(), None);
        assert_eq!(failed.error_message(), Some("boom"));
    }
}
