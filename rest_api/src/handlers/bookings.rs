// rest_api/src/handlers/bookings.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::errors::RestApiError;
use crate::gate::StaffGate;
use crate::handlers::{path_id, ApiResult};
use crate::state::AppState;
use crate::validation::{CreateBookingRequest, UpdateBookingRequest, ValidatedJson};

pub async fn create(
    State(state): State<AppState>,
    StaffGate(_staff): StaffGate,
    ValidatedJson(payload): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Value>), RestApiError> {
    let booking = state.bookings.create_booking(payload.into_new_booking()?).await?;
    let view = state.bookings.present(&booking).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Booking created successfully",
            "booking": view,
        })),
    ))
}

pub async fn list(State(state): State<AppState>, StaffGate(_staff): StaffGate) -> ApiResult {
    let bookings = state.bookings.list_bookings().await?;
    let views = state.bookings.present_all(&bookings).await?;
    Ok(Json(json!({ "message": "Success", "bookings": views })))
}

pub async fn for_patient(
    State(state): State<AppState>,
    StaffGate(_staff): StaffGate,
    Path(patient_id): Path<String>,
) -> ApiResult {
    let bookings = state
        .bookings
        .bookings_for_patient(&path_id("patientId", &patient_id)?)
        .await?;
    let views = state.bookings.present_all(&bookings).await?;
    Ok(Json(json!({ "message": "Success", "bookings": views })))
}

pub async fn for_doctor(
    State(state): State<AppState>,
    StaffGate(_staff): StaffGate,
    Path(doctor_id): Path<String>,
) -> ApiResult {
    let bookings = state
        .bookings
        .bookings_for_doctor(&path_id("doctorId", &doctor_id)?)
        .await?;
    let views = state.bookings.present_all(&bookings).await?;
    Ok(Json(json!({ "message": "Success", "bookings": views })))
}

pub async fn by_id(
    State(state): State<AppState>,
    StaffGate(_staff): StaffGate,
    Path(id): Path<String>,
) -> ApiResult {
    let booking = state.bookings.get_booking(&path_id("id", &id)?).await?;
    let view = state.bookings.present(&booking).await?;
    Ok(Json(json!({ "message": "Success", "booking": view })))
}

// Public: the code is the patient's only credential, and details stay
// hidden until the balance is paid.
pub async fn by_code(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult {
    let booking = state.bookings.disclose_booking_by_code(&code).await?;
    let view = state.bookings.present(&booking).await?;
    Ok(Json(json!({ "message": "Success", "booking": view })))
}

pub async fn update(
    State(state): State<AppState>,
    StaffGate(_staff): StaffGate,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateBookingRequest>,
) -> ApiResult {
    let booking = state
        .bookings
        .update_booking(&path_id("id", &id)?, payload.into_patch()?)
        .await?;
    let view = state.bookings.present(&booking).await?;
    Ok(Json(json!({
        "message": "Booking updated successfully",
        "booking": view,
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    StaffGate(_staff): StaffGate,
    Path(id): Path<String>,
) -> ApiResult {
    state.bookings.delete_booking(&path_id("id", &id)?).await?;
    Ok(Json(json!({ "message": "Booking deleted successfully" })))
}
