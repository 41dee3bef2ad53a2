// rest_api/src/handlers/users.rs

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::errors::RestApiError;
use crate::gate::StaffGate;
use crate::handlers::ApiResult;
use crate::state::AppState;
use crate::validation::{CreatePatientRequest, ValidatedJson};

// Handler for the /api/users/me endpoint
pub async fn me(State(state): State<AppState>, StaffGate(staff): StaffGate) -> ApiResult {
    let user = state.identities.me(&staff.id()).await?;
    Ok(Json(json!({ "message": "Success", "user": user })))
}

// Handler for the /api/users/doctors endpoint, open to anyone
pub async fn list_doctors(State(state): State<AppState>) -> ApiResult {
    let doctors = state.identities.list_doctors().await?;
    Ok(Json(json!({ "message": "Success", "doctors": doctors })))
}

// Handler for POST /api/users/patients
pub async fn create_patient(
    State(state): State<AppState>,
    StaffGate(_staff): StaffGate,
    ValidatedJson(payload): ValidatedJson<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Value>), RestApiError> {
    let patient = state.identities.create_patient(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Patient created successfully", "patient": patient }))))
}

// Handler for GET /api/users/patients
pub async fn list_patients(State(state): State<AppState>, StaffGate(_staff): StaffGate) -> ApiResult {
    let patients = state.identities.list_patients().await?;
    Ok(Json(json!({ "message": "Success", "patients": patients })))
}
