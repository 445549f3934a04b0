//! Course records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit::{self, AuditStamp};
use crate::repository::{Audited, Entity, Field, Record, RepositoryError};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Course {
    pub id: i32,
    pub title: String,
    pub credits: i32,
    #[sqlx(flatten)]
    pub audit: AuditStamp,
}

impl Course {
    /// Unsaved course; the store assigns the id on `add`.
    pub fn new(title: impl Into<String>, credits: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            credits,
            audit: AuditStamp::new(now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CourseField {
    Id,
    Title,
    Credits,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
}

impl Field for CourseField {
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::Title,
        Self::Credits,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::CreatedBy,
        Self::UpdatedBy,
    ];

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Credits => "credits",
            Self::CreatedAt => audit::CREATED_AT,
            Self::UpdatedAt => audit::UPDATED_AT,
            Self::CreatedBy => audit::CREATED_BY,
            Self::UpdatedBy => audit::UPDATED_BY,
        }
    }
}

impl Entity for Course {
    type Field = CourseField;

    const TABLE: &'static str = "courses";
    const NAME: &'static str = "Course";
    const ID: CourseField = CourseField::Id;

    fn id(&self) -> i32 {
        self.id
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new()
            .with(CourseField::Id, self.id)
            .with(CourseField::Title, &self.title)
            .with(CourseField::Credits, self.credits);
        self.audit.write(&mut record);
        record
    }

    fn from_record(record: &Record) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: record.int32("id")?,
            title: record.text("title")?,
            credits: record.int32("credits")?,
            audit: AuditStamp::read(record)?,
        })
    }
}

impl Audited for Course {
    const UPDATED_AT: CourseField = CourseField::UpdatedAt;
    const UPDATED_BY: CourseField = CourseField::UpdatedBy;
}

/// Course as exposed over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDto {
    pub id: i32,
    pub title: String,
    pub credits: i32,
}

impl From<Course> for CourseDto {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            credits: course.credits,
        }
    }
}

/// Body of `POST /api/courses`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCreateDto {
    pub title: String,
    pub credits: i32,
}

impl CourseCreateDto {
    pub fn into_course(self, now: DateTime<Utc>) -> Course {
        Course::new(self.title, self.credits, now)
    }
}
