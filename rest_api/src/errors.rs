// rest_api/src/errors.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use lib::errors::LabError;

// Define the REST API error enum
#[derive(Debug, Error)]
pub enum RestApiError {
    #[error(transparent)]
    Lab(#[from] LabError),
    /// Malformed JSON or request schema violations, one message per problem.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

impl RestApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        RestApiError::Lab(LabError::Unauthorized(message.into()))
    }
}

// Implement IntoResponse for RestApiError to convert it into an HTTP response
impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            RestApiError::Validation(errors) => {
                let body = Json(json!({
                    "status": "error",
                    "message": "Validation failed",
                    "errors": errors,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            RestApiError::Lab(LabError::InvalidInput(msg)) => (StatusCode::BAD_REQUEST, msg),
            RestApiError::Lab(LabError::Unauthorized(msg)) => (StatusCode::UNAUTHORIZED, msg),
            RestApiError::Lab(LabError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg),
            RestApiError::Lab(LabError::Conflict(msg)) => (StatusCode::CONFLICT, msg),
            RestApiError::Lab(LabError::PaymentRequired(msg)) => (StatusCode::PAYMENT_REQUIRED, msg),
            RestApiError::Lab(LabError::Upstream(detail)) => {
                error!("Request failed: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };

        let body = Json(json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: LabError) -> StatusCode {
        RestApiError::from(err).into_response().status()
    }

    #[test]
    fn lab_errors_map_to_statuses() {
        assert_eq!(status_of(LabError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(LabError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(LabError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(LabError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(LabError::PaymentRequired("x".into())), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(status_of(LabError::Upstream("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let response = RestApiError::Validation(vec!["name is required".into()]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
