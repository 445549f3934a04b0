//! `/api/Enrollment` endpoints
//!
//! Both foreign keys are checked by the store; a dangling course or student
//! id surfaces as an opaque 500.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use tracing::instrument;

use super::cancellation::RequestCancellation;
use super::error::{ApiError, ApiOperation};
use crate::entities::{
    Enrollment, EnrollmentCreateDto, EnrollmentDto, EnrollmentField, SYSTEM_ACTOR,
};
use crate::middleware::RequireAdmin;
use crate::repository::{
    Entity, Filter, OrderDirection, PageRequest, PagedResult, Repository, UpdateSet,
};
use crate::state::AppState;

pub const ENROLLMENTS_PATH: &str = "/api/Enrollment";

#[instrument(skip_all)]
pub async fn list_enrollments(
    State(state): State<AppState>,
    cancel: RequestCancellation,
    Query(page): Query<PageRequest>,
) -> Result<Json<PagedResult<EnrollmentDto>>, ApiError> {
    let page = state
        .repository::<Enrollment>()
        .query()
        .order_by(EnrollmentField::Id, OrderDirection::Ascending)
        .project(EnrollmentDto::from)
        .paginate(page, state.paging(), &cancel)
        .await?;

    Ok(Json(page))
}

#[instrument(skip_all, fields(id = id))]
pub async fn get_enrollment(
    State(state): State<AppState>,
    cancel: RequestCancellation,
    Path(id): Path<i32>,
) -> Result<Json<EnrollmentDto>, ApiError> {
    let found = state
        .repository::<Enrollment>()
        .query()
        .filter(Filter::eq(EnrollmentField::Id, id))
        .project(EnrollmentDto::from)
        .first(&cancel)
        .await?;

    found
        .map(Json)
        .ok_or_else(|| ApiError::not_found(Enrollment::NAME, "enrollment not found!", id))
}

#[instrument(skip_all)]
pub async fn create_enrollment(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    cancel: RequestCancellation,
    Json(dto): Json<EnrollmentCreateDto>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollment = state
        .repository::<Enrollment>()
        .add(dto.into_enrollment(Utc::now()), &cancel)
        .await?;

    let location = format!("{}/{}", ENROLLMENTS_PATH, enrollment.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(EnrollmentDto::from(enrollment)),
    ))
}

#[instrument(skip_all, fields(id = id))]
pub async fn update_enrollment(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    cancel: RequestCancellation,
    Path(id): Path<i32>,
    Json(dto): Json<EnrollmentDto>,
) -> Result<StatusCode, ApiError> {
    if dto.id != id {
        return Err(ApiError::validation_mismatch(
            "Route ID and body ID do not match.",
        ));
    }

    let setters = UpdateSet::new()
        .set(EnrollmentField::CourseId, dto.course_id)
        .set(EnrollmentField::StudentId, dto.student_id)
        .touch::<Enrollment>(Utc::now(), SYSTEM_ACTOR);

    let updated = state
        .repository::<Enrollment>()
        .update_where(vec![Filter::eq(EnrollmentField::Id, id)], setters, &cancel)
        .await?;

    if updated == 0 {
        return Err(
            ApiError::not_found(Enrollment::NAME, "enrollment not found!", id)
                .with_operation(ApiOperation::Update),
        );
    }

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(id = id))]
pub async fn delete_enrollment(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    cancel: RequestCancellation,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .repository::<Enrollment>()
        .delete_by_id(id, &cancel)
        .await?;

    if deleted == 0 {
        return Err(
            ApiError::not_found(Enrollment::NAME, "enrollment not found!", id)
                .with_operation(ApiOperation::Delete),
        );
    }

    Ok(StatusCode::NO_CONTENT)
}
