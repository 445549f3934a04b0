//! `/api/Student` endpoints

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
use crate::entities::{Student, StudentCreateDto, StudentDto, StudentField, SYSTEM_ACTOR};
use crate::middleware::RequireAdmin;
use crate::repository::{
    Entity, Filter, OrderDirection, PageRequest, PagedResult, Repository, UpdateSet,
};
use crate::state::AppState;

pub const STUDENTS_PATH: &str = "/api/Student";

#[instrument(skip_all)]
pub async fn list_students(
    State(state): State<AppState>,
    cancel: RequestCancellation,
    Query(page): Query<PageRequest>,
) -> Result<Json<PagedResult<StudentDto>>, ApiError> {
    let page = state
        .repository::<Student>()
        .query()
        .order_by(StudentField::Id, OrderDirection::Ascending)
        .project(StudentDto::from)
        .paginate(page, state.paging(), &cancel)
        .await?;

    Ok(Json(page))
}

#[instrument(skip_all, fields(id = id))]
pub async fn get_student(
    State(state): State<AppState>,
    cancel: RequestCancellation,
    Path(id): Path<i32>,
) -> Result<Json<StudentDto>, ApiError> {
    let found = state
        .repository::<Student>()
        .query()
        .filter(Filter::eq(StudentField::Id, id))
        .project(StudentDto::from)
        .first(&cancel)
        .await?;

    found
        .map(Json)
        .ok_or_else(|| ApiError::not_found(Student::NAME, "student not found!", id))
}

/// The response carries the stored record, including its new id
#[instrument(skip_all)]
pub async fn create_student(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    cancel: RequestCancellation,
    Json(dto): Json<StudentCreateDto>,
) -> Result<impl IntoResponse, ApiError> {
    let student = state
        .repository::<Student>()
        .add(dto.into_student(Utc::now()), &cancel)
        .await?;

    let location = format!("{}/{}", STUDENTS_PATH, student.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(StudentDto::from(student)),
    ))
}

#[instrument(skip_all, fields(id = id))]
pub async fn update_student(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    cancel: RequestCancellation,
    Path(id): Path<i32>,
    Json(dto): Json<StudentDto>,
) -> Result<StatusCode, ApiError> {
    if dto.id != id {
        return Err(ApiError::validation_mismatch(
            "Route ID and course ID do not match.",
        ));
    }

    let setters = UpdateSet::new()
        .set(StudentField::FirstName, dto.first_name)
        .set(StudentField::LastName, dto.last_name)
        .set(StudentField::DateOfBirth, dto.date_of_birth)
        .set(StudentField::IdNumber, dto.id_number)
        .set(StudentField::Picture, dto.picture)
        .touch::<Student>(Utc::now(), SYSTEM_ACTOR);

    let updated = state
        .repository::<Student>()
        .update_where(vec![Filter::eq(StudentField::Id, id)], setters, &cancel)
        .await?;

    if updated == 0 {
        return Err(ApiError::not_found(Student::NAME, "student not found!", id)
            .with_operation(ApiOperation::Update));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(id = id))]
pub async fn delete_student(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    cancel: RequestCancellation,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .repository::<Student>()
        .delete_by_id(id, &cancel)
        .await?;

    if deleted == 0 {
        return Err(ApiError::not_found(Student::NAME, "student not found!", id)
            .with_operation(ApiOperation::Delete));
    }

    Ok(StatusCode::NO_CONTENT)
}
