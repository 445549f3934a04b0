//! HTTP endpoints for courses, students, enrollments and authentication
//!
//! Reads are anonymous. Every write goes through the
//! [`RequireAdmin`](crate::middleware::RequireAdmin) extractor, so a request
//! without an admin token never reaches the repository.
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | GET | `/api/courses`, `/api/Student`, `/api/Enrollment` | none |
//! | GET | `…/{id}` | none |
//! | POST | collection path | Admin |
//! | PUT, DELETE | `…/{id}` | Admin |
//! | POST | `/api/authentication/login`, `/api/authentication/register` | none |
//!
//! Deleting a course or student that an enrollment still points at answers
//! `409 Conflict` and leaves both rows in place.
//!
//! Each handler receives a [`RequestCancellation`] that is cancelled on
//! shutdown or when the request is abandoned.

mod auth;
mod cancellation;
mod courses;
mod enrollments;
mod error;
mod students;

use axum::{routing::get, routing::post, Router};

pub use auth::{LOGIN_PATH, REGISTER_PATH};
pub use cancellation::RequestCancellation;
pub use courses::COURSES_PATH;
pub use enrollments::ENROLLMENTS_PATH;
pub use error::{ApiError, ApiErrorKind, ApiErrorResponse, ApiOperation, CLIENT_CLOSED_REQUEST};
pub use students::STUDENTS_PATH;

use crate::health::{health, readiness};
use crate::state::AppState;

/// Build the application router
///
/// Layers (tracing, timeouts, CORS and so on) are added by
/// [`Server::serve`](crate::server::Server::serve).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(readiness))
        .route(
            COURSES_PATH,
            get(courses::list_courses).post(courses::create_course),
        )
        .route(
            &format!("{}/{{id}}", COURSES_PATH),
            get(courses::get_course)
                .put(courses::update_course)
                .delete(courses::delete_course),
        )
        .route(
            STUDENTS_PATH,
            get(students::list_students).post(students::create_student),
        )
        .route(
            &format!("{}/{{id}}", STUDENTS_PATH),
            get(students::get_student)
                .put(students::update_student)
                .delete(students::delete_student),
        )
        .route(
            ENROLLMENTS_PATH,
            get(enrollments::list_enrollments).post(enrollments::create_enrollment),
        )
        .route(
            &format!("{}/{{id}}", ENROLLMENTS_PATH),
            get(enrollments::get_enrollment)
                .put(enrollments::update_enrollment)
                .delete(enrollments::delete_enrollment),
        )
        .route(LOGIN_PATH, post(auth::login))
        .route(REGISTER_PATH, post(auth::register))
        .with_state(state)
}
