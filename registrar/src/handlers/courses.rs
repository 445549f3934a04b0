//! `/api/courses` endpoints

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
use crate::entities::{Course, CourseCreateDto, CourseDto, CourseField, SYSTEM_ACTOR};
use crate::middleware::RequireAdmin;
use crate::repository::{
    Entity, Filter, OrderDirection, PageRequest, PagedResult, Repository, UpdateSet,
};
use crate::state::AppState;

pub const COURSES_PATH: &str = "/api/courses";

/// Paged list ordered by id
#[instrument(skip_all)]
pub async fn list_courses(
    State(state): State<AppState>,
    cancel: RequestCancellation,
    Query(page): Query<PageRequest>,
) -> Result<Json<PagedResult<CourseDto>>, ApiError> {
    let page = state
        .repository::<Course>()
        .query()
        .order_by(CourseField::Id, OrderDirection::Ascending)
        .project(CourseDto::from)
        .paginate(page, state.paging(), &cancel)
        .await?;

    Ok(Json(page))
}

#[instrument(skip_all, fields(id = id))]
pub async fn get_course(
    State(state): State<AppState>,
    cancel: RequestCancellation,
    Path(id): Path<i32>,
) -> Result<Json<CourseDto>, ApiError> {
    let found = state
        .repository::<Course>()
        .query()
        .filter(Filter::eq(CourseField::Id, id))
        .project(CourseDto::from)
        .first(&cancel)
        .await?;

    found
        .map(Json)
        .ok_or_else(|| ApiError::not_found(Course::NAME, "course not found!", id))
}

#[instrument(skip_all)]
pub async fn create_course(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    cancel: RequestCancellation,
    Json(dto): Json<CourseCreateDto>,
) -> Result<impl IntoResponse, ApiError> {
    let course = state
        .repository::<Course>()
        .add(dto.into_course(Utc::now()), &cancel)
        .await?;

    let location = format!("{}/{}", COURSES_PATH, course.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(CourseDto::from(course)),
    ))
}

/// Overwrite title and credits; the body id must match the route id
#[instrument(skip_all, fields(id = id))]
pub async fn update_course(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    cancel: RequestCancellation,
    Path(id): Path<i32>,
    Json(dto): Json<CourseDto>,
) -> Result<StatusCode, ApiError> {
    if dto.id != id {
        return Err(ApiError::validation_mismatch(
            "Route ID and course ID do not match.",
        ));
    }

    let setters = UpdateSet::new()
        .set(CourseField::Title, dto.title)
        .set(CourseField::Credits, dto.credits)
        .touch::<Course>(Utc::now(), SYSTEM_ACTOR);

    let updated = state
        .repository::<Course>()
        .update_where(vec![Filter::eq(CourseField::Id, id)], setters, &cancel)
        .await?;

    if updated == 0 {
        return Err(
            ApiError::not_found(Course::NAME, format!("course with Id: {} is missing", id), id)
                .with_operation(ApiOperation::Update),
        );
    }

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(id = id))]
pub async fn delete_course(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    cancel: RequestCancellation,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .repository::<Course>()
        .delete_by_id(id, &cancel)
        .await?;

    if deleted == 0 {
        return Err(ApiError::not_found(Course::NAME, "course not found!", id)
            .with_operation(ApiOperation::Delete));
    }

    Ok(StatusCode::NO_CONTENT)
}
