//! Persisted records and their HTTP transfer shapes
//!
//! Every entity shares the same audit block ([`AuditStamp`]) and a field
//! enum that names its columns for filters, ordering and setters.

mod audit;
mod course;
mod enrollment;
mod student;
mod user;

pub use audit::{AuditStamp, SYSTEM_ACTOR};
pub use course::{Course, CourseCreateDto, CourseDto, CourseField};
pub use enrollment::{Enrollment, EnrollmentCreateDto, EnrollmentDto, EnrollmentField};
pub use student::{Student, StudentCreateDto, StudentDto, StudentField};
pub use user::{User, UserField, ADMIN_ROLE, USER_ROLE};
