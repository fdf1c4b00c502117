pub mod calculator;
pub mod error;
pub mod model;
pub mod ports;
pub mod service;

pub use calculator::{CraneCapacityEstimator, LoadingTimeEstimator};
pub use error::DomainError;
pub use model::{
    CalculationInput, CalculationRequest, CalculationResult, CraneRecord, IntakeVariant, Outcome,
    RequestId,
};
pub use ports::CompletionObserver;
pub use service::LoadingTimeService;
