// rest_api/src/handlers/results.rs

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;

use crate::gate::DoctorGate;
use crate::handlers::{path_id, ApiResult};
use crate::state::AppState;
use crate::validation::{AddResultsRequest, ValidatedJson};

// Handler for PUT /api/results/:id. The submitted list replaces whatever the
// booking held before.
pub async fn replace(
    State(state): State<AppState>,
    DoctorGate(doctor): DoctorGate,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<AddResultsRequest>,
) -> ApiResult {
    let booking = state
        .bookings
        .add_result(&path_id("id", &id)?, &doctor, payload.into_results()?)
        .await?;
    let view = state.bookings.present(&booking).await?;
    Ok(Json(json!({
        "message": "Booking updated successfully",
        "booking": view,
    })))
}
