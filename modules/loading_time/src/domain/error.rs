use thiserror::Error;

use crate::runner::RunnerError;

/// Errors surfaced synchronously to the submitter.
///
/// Computation and delivery failures never appear here: the former become
/// failure results, the latter are logged by the callback dispatcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Calculation queue is not accepting work")]
    Unavailable,
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<RunnerError> for DomainError {
    fn from(e: RunnerError) -> Self {
        match e {
            RunnerError::Closed => Self::Unavailable,
        }
    }
}
