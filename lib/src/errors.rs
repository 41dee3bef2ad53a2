// lib/src/errors.rs

use thiserror::Error;

use bincode::error::{DecodeError, EncodeError};
use models::errors::ValidationError;
use serde_json::Error as SerdeJsonError;
use sled::transaction::TransactionError;
use uuid::Error as UuidError;

/// Failure taxonomy shared by every service of the lab backend.
#[derive(Debug, Error)]
pub enum LabError {
    /// Schema or business-rule violation, malformed identifier.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing, invalid or expired credential, or the wrong role.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    /// Duplicate unique field (staff email, test title, booking code).
    #[error("Already Exists: {0}")]
    Conflict(String),

    /// Booking details are withheld until the balance is settled.
    #[error("Payment required: {0}")]
    PaymentRequired(String),

    /// Persistence or notification transport failure.
    #[error("Upstream failure: {0}")]
    Upstream(String),
}

pub type Result<T> = std::result::Result<T, LabError>;

impl LabError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, LabError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LabError::NotFound(_))
    }
}

impl From<ValidationError> for LabError {
    fn from(err: ValidationError) -> Self {
        LabError::InvalidInput(err.to_string())
    }
}

impl From<sled::Error> for LabError {
    fn from(err: sled::Error) -> Self {
        LabError::Upstream(format!("Database operation failed: {}", err))
    }
}

impl From<TransactionError<LabError>> for LabError {
    fn from(err: TransactionError<LabError>) -> Self {
        match err {
            TransactionError::Abort(inner) => inner,
            TransactionError::Storage(storage) => storage.into(),
        }
    }
}

impl From<DecodeError> for LabError {
    fn from(err: DecodeError) -> Self {
        LabError::Upstream(format!("Bincode decode error: {}", err))
    }
}

impl From<EncodeError> for LabError {
    fn from(err: EncodeError) -> Self {
        LabError::Upstream(format!("Bincode encode error: {}", err))
    }
}

impl From<SerdeJsonError> for LabError {
    fn from(err: SerdeJsonError) -> Self {
        LabError::Upstream(format!("JSON serialization/deserialization error: {}", err))
    }
}

impl From<UuidError> for LabError {
    fn from(err: UuidError) -> Self {
        LabError::InvalidInput(format!("UUID error: {}", err))
    }
}

impl From<reqwest::Error> for LabError {
    fn from(err: reqwest::Error) -> Self {
        LabError::Upstream(format!("Request error: {}", err))
    }
}

impl From<tokio::task::JoinError> for LabError {
    fn from(err: tokio::task::JoinError) -> Self {
        LabError::Upstream(format!("Async task join error: {}", err))
    }
}

impl From<anyhow::Error> for LabError {
    fn from(err: anyhow::Error) -> Self {
        LabError::Upstream(format!("An internal error occurred: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_become_invalid_input() {
        let err: LabError = ValidationError::EmptyTestList.into();
        assert!(matches!(err, LabError::InvalidInput(msg) if msg.contains("at least one")));
    }

    #[test]
    fn transaction_abort_unwraps_inner_error() {
        let err: LabError = TransactionError::Abort(LabError::Conflict("email".into())).into();
        assert!(err.is_conflict());
    }
}
