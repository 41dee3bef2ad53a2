// models/src/errors.rs

pub use thiserror::Error;

/// A domain validation error raised by the record types themselves.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// An identifier is not a well-formed record id.
    #[error("{field} '{value}' is not a valid identifier")]
    InvalidIdentifier { field: &'static str, value: String },
    /// A booking code does not follow the `BKG-` format.
    #[error("booking code '{0}' is malformed")]
    InvalidBookingCode(String),
    /// A role name outside of the known set.
    #[error("role '{0}' is not one of doctor, assistant, patient")]
    UnknownRole(String),
    /// A monetary amount was negative, zero where forbidden, or not finite.
    #[error("{field} must be {expectation}")]
    InvalidAmount { field: &'static str, expectation: &'static str },
    /// The paid amount exceeds the total price of the booking.
    #[error("amount paid ({paid}) exceeds the total price ({total})")]
    Overpayment { paid: f64, total: f64 },
    /// The offer price is missing, present without an offer, or not below the price.
    #[error("{0}")]
    InvalidOffer(&'static str),
    /// A normal range whose lower bound is above the upper bound.
    #[error("normal range minimum ({min}) is greater than maximum ({max})")]
    InvalidRange { min: f64, max: f64 },
    /// A booking must reference at least one medical test.
    #[error("at least one medical test must be provided")]
    EmptyTestList,
    /// A result entry references a test that is not part of the booking.
    #[error("medical test {0} is not part of this booking")]
    ResultForUnbookedTest(String),
    /// A result value that is not a finite number.
    #[error("result value for medical test {0} must be a finite number")]
    InvalidResultValue(String),
}

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;
