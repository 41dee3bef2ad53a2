// rest_api/src/gate.rs
// Bearer-token extractors. Every failure, whatever its cause, is a 401.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, warn};

use lib::errors::LabError;
use models::medical::Identity;
use security::Access;

use crate::errors::RestApiError;
use crate::state::AppState;

/// A doctor or an assistant.
pub struct StaffGate(pub Identity);

/// A doctor.
pub struct DoctorGate(pub Identity);

fn bearer_token(parts: &Parts) -> Result<&str, RestApiError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| RestApiError::unauthorized("No token provided"))
}

async fn admit(parts: &Parts, state: &AppState, access: Access) -> Result<Identity, RestApiError> {
    let token = bearer_token(parts)?;
    state
        .identities
        .authenticate(token, access)
        .await
        .map_err(|err| match err {
            LabError::Unauthorized(reason) if reason == access.denial() => RestApiError::unauthorized(reason),
            LabError::Unauthorized(reason) => {
                debug!("Access denied: {}", reason);
                RestApiError::unauthorized("Invalid or expired token")
            }
            other => {
                warn!("Access check failed: {}", other);
                RestApiError::unauthorized("Invalid or expired token")
            }
        })
}

#[axum::async_trait]
impl FromRequestParts<AppState> for StaffGate {
    type Rejection = RestApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        admit(parts, state, Access::Staff).await.map(StaffGate)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for DoctorGate {
    type Rejection = RestApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        admit(parts, state, Access::DoctorOnly).await.map(DoctorGate)
    }
}
