//! `/api/authentication` endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::instrument;

use super::cancellation::RequestCancellation;
use super::error::{ApiError, ApiOperation};
use crate::auth::{AuthResponse, Credentials};
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/api/authentication/login";
pub const REGISTER_PATH: &str = "/api/authentication/register";

/// Exchange credentials for a bearer token
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    cancel: RequestCancellation,
    Json(credentials): Json<Credentials>,
) -> Result<Json<AuthResponse>, ApiError> {
    let response = state
        .authenticator()
        .authenticate(&credentials.email, &credentials.password, &cancel)
        .await?;

    Ok(Json(response))
}

/// Create a regular user account
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    cancel: RequestCancellation,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .authenticator()
        .register(&credentials.email, &credentials.password, &cancel)
        .await
        .map_err(|e| ApiError::from(e).with_operation(ApiOperation::Register))?;

    Ok((StatusCode::CREATED, Json(user)))
}
