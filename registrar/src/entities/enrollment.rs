//! Enrollment of a student in a course

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit::{self, AuditStamp};
use crate::repository::{Audited, Constraint, Entity, Field, Record, RepositoryError};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Enrollment {
    pub id: i32,
    pub course_id: i32,
    pub student_id: i32,
    #[sqlx(flatten)]
    pub audit: AuditStamp,
}

impl Enrollment {
    pub fn new(course_id: i32, student_id: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            course_id,
            student_id,
            audit: AuditStamp::new(now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrollmentField {
    Id,
    CourseId,
    StudentId,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
}

impl Field for EnrollmentField {
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::CourseId,
        Self::StudentId,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::CreatedBy,
        Self::UpdatedBy,
    ];

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::CourseId => "course_id",
            Self::StudentId => "student_id",
            Self::CreatedAt => audit::CREATED_AT,
            Self::UpdatedAt => audit::UPDATED_AT,
            Self::CreatedBy => audit::CREATED_BY,
            Self::UpdatedBy => audit::UPDATED_BY,
        }
    }
}

const CONSTRAINTS: &[Constraint] = &[
    Constraint::ForeignKey {
        name: "enrollments_course_id_fkey",
        column: "course_id",
        references: "courses",
    },
    Constraint::ForeignKey {
        name: "enrollments_student_id_fkey",
        column: "student_id",
        references: "students",
    },
];

impl Entity for Enrollment {
    type Field = EnrollmentField;

    const TABLE: &'static str = "enrollments";
    const NAME: &'static str = "Enrollment";
    const ID: EnrollmentField = EnrollmentField::Id;

    fn id(&self) -> i32 {
        self.id
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new()
            .with(EnrollmentField::Id, self.id)
            .with(EnrollmentField::CourseId, self.course_id)
            .with(EnrollmentField::StudentId, self.student_id);
        self.audit.write(&mut record);
        record
    }

    fn from_record(record: &Record) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: record.int32("id")?,
            course_id: record.int32("course_id")?,
            student_id: record.int32("student_id")?,
            audit: AuditStamp::read(record)?,
        })
    }

    fn constraints() -> &'static [Constraint] {
        CONSTRAINTS
    }
}

impl Audited for Enrollment {
    const UPDATED_AT: EnrollmentField = EnrollmentField::UpdatedAt;
    const UPDATED_BY: EnrollmentField = EnrollmentField::UpdatedBy;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentDto {
    pub id: i32,
    pub course_id: i32,
    pub student_id: i32,
}

impl From<Enrollment> for EnrollmentDto {
    fn from(enrollment: Enrollment) -> Self {
        Self {
            id: enrollment.id,
            course_id: enrollment.course_id,
            student_id: enrollment.student_id,
        }
    }
}

/// Body of `POST /api/Enrollment`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentCreateDto {
    pub course_id: i32,
    pub student_id: i32,
}

impl EnrollmentCreateDto {
    pub fn into_enrollment(self, now: DateTime<Utc>) -> Enrollment {
        Enrollment::new(self.course_id, self.student_id, now)
    }
}
