// rest_api/src/handlers/auth.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::errors::RestApiError;
use crate::handlers::ApiResult;
use crate::state::AppState;
use crate::validation::{
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, ValidatedJson,
};

// Handler for the /api/auth/register endpoint
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), RestApiError> {
    let staff = state.identities.register(payload.into_registration()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registered successfully",
            "staff": staff,
        })),
    ))
}

// Handler for the /api/auth/login endpoint
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> ApiResult {
    let session = state.identities.login(&payload.email, &payload.password).await?;
    Ok(Json(json!({
        "message": "Login successful",
        "staff": session.user,
        "token": session.token,
    })))
}

// Handler for the /api/auth/forgot-password endpoint
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ForgotPasswordRequest>,
) -> ApiResult {
    // The reset email goes out in the background.
    let _sending = state.identities.forgot_password(&payload.email).await?;
    Ok(Json(json!({
        "message": "If this email exists, a reset link has been sent",
    })))
}

// Handler for the /api/auth/reset-password/:token endpoint
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ValidatedJson(payload): ValidatedJson<ResetPasswordRequest>,
) -> ApiResult {
    state.identities.reset_password(&token, &payload.password).await?;
    Ok(Json(json!({
        "message": "Password reset successful",
    })))
}
