// rest_api/src/handlers/mod.rs

pub mod auth;
pub mod bookings;
pub mod results;
pub mod users;

use axum::Json;
use serde_json::{json, Value};

use lib::errors::LabError;
use models::identifiers::RecordId;

use crate::errors::RestApiError;

pub type ApiResult = Result<Json<Value>, RestApiError>;

/// Path ids are parsed up front so a malformed id is a 400, not a lookup miss.
pub(crate) fn path_id(field: &'static str, raw: &str) -> Result<RecordId, RestApiError> {
    RecordId::parse_field(field, raw.trim())
        .map_err(|err| RestApiError::Lab(LabError::InvalidInput(err.to_string())))
}

// Handler for the /api/health endpoint
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
