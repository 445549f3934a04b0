//! Bearer-token gate for mutating routes
//!
//! Adding [`RequireAdmin`] to a handler's arguments makes the route
//! admin-only: a missing or invalid token is rejected with 401, a valid
//! token without the `Admin` role with 403. The handler body never runs in
//! either case.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::{extract_token, Claims, TokenValidator};
use crate::entities::ADMIN_ROLE;
use crate::error::Error;
use crate::handlers::ApiError;
use crate::state::AppState;

/// Claims of an authenticated administrator
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Claims);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = authorize(&parts.headers, state.issuer())?;
        parts.extensions.insert(claims.clone());
        Ok(Self(claims))
    }
}

fn authorize<V: TokenValidator>(
    headers: &axum::http::HeaderMap,
    validator: &V,
) -> Result<Claims, ApiError> {
    let token = extract_token(headers).map_err(|e| match e {
        Error::Unauthorized(message) => ApiError::unauthorized(message),
        other => ApiError::unauthorized(other.to_string()),
    })?;

    let claims = validator.validate(&token).map_err(|e| {
        tracing::debug!(error = %e, "bearer token rejected");
        ApiError::unauthorized("Invalid or expired token")
    })?;

    if !claims.has_role(ADMIN_ROLE) {
        tracing::info!(user_id = claims.user_id, "non-admin token on admin route");
        return Err(ApiError::forbidden(format!(
            "The '{}' role is required",
            ADMIN_ROLE
        )));
    }

    Ok(claims)
}
