// rest_api/src/validation/mod.rs
// Request schemas. Every body is decoded with unknown fields denied and then
// checked field by field; all problems are reported together.

pub mod requests;

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;

use models::identifiers::RecordId;

use crate::errors::RestApiError;

pub use requests::*;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles");
    static ref URL_RE: Regex =
        Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("url pattern compiles");
}

pub trait Validate {
    /// Returns one message per violated rule; empty when the request is valid.
    fn validate(&self) -> Vec<String>;
}

/// `Json<T>` that also runs [`Validate`] before the handler sees the body.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = RestApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| RestApiError::Validation(vec![rejection.body_text()]))?;
        let errors = value.validate();
        if !errors.is_empty() {
            return Err(RestApiError::Validation(errors));
        }
        Ok(Self(value))
    }
}

pub(crate) fn check_length(errors: &mut Vec<String>, field: &str, value: &str, min: usize, max: usize) {
    let length = value.trim().chars().count();
    if length == 0 {
        errors.push(format!("{} is required", field));
    } else if length < min {
        errors.push(format!("{} must be at least {} characters", field, min));
    } else if length > max {
        errors.push(format!("{} must be at most {} characters", field, max));
    }
}

pub(crate) fn check_required(errors: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{} is required", field));
    }
}

pub(crate) fn check_email(errors: &mut Vec<String>, field: &str, value: &str) {
    if !EMAIL_RE.is_match(value.trim()) {
        errors.push(format!("{} must be valid", field));
    }
}

pub(crate) fn check_url(errors: &mut Vec<String>, field: &str, value: &str) {
    if !URL_RE.is_match(value.trim()) {
        errors.push(format!("{} must be a valid URL", field));
    }
}

pub(crate) fn check_id(errors: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().parse::<RecordId>().is_err() {
        errors.push(format!("{} must be a valid id", field));
    }
}

pub(crate) fn check_positive(errors: &mut Vec<String>, field: &str, value: f64) {
    if !value.is_finite() || value <= 0.0 {
        errors.push(format!("{} must be greater than 0", field));
    }
}

pub(crate) fn check_non_negative(errors: &mut Vec<String>, field: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        errors.push(format!("{} must be greater than or equal to 0", field));
    }
}
