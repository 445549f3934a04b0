//! Student records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::audit::{self, AuditStamp};
use crate::repository::{Audited, Constraint, Entity, Field, Record, RepositoryError};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Student {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// National or institutional id, unique across students
    pub id_number: String,
    pub picture: Option<String>,
    #[sqlx(flatten)]
    pub audit: AuditStamp,
}

impl Student {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        date_of_birth: NaiveDate,
        id_number: impl Into<String>,
        picture: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            first_name: first_name.into(),
            last_name: last_name.into(),
            date_of_birth,
            id_number: id_number.into(),
            picture,
            audit: AuditStamp::new(now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StudentField {
    Id,
    FirstName,
    LastName,
    DateOfBirth,
    IdNumber,
    Picture,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
}

impl Field for StudentField {
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::FirstName,
        Self::LastName,
        Self::DateOfBirth,
        Self::IdNumber,
        Self::Picture,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::CreatedBy,
        Self::UpdatedBy,
    ];

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::DateOfBirth => "date_of_birth",
            Self::IdNumber => "id_number",
            Self::Picture => "picture",
            Self::CreatedAt => audit::CREATED_AT,
            Self::UpdatedAt => audit::UPDATED_AT,
            Self::CreatedBy => audit::CREATED_BY,
            Self::UpdatedBy => audit::UPDATED_BY,
        }
    }
}

const CONSTRAINTS: &[Constraint] = &[Constraint::Unique {
    name: "students_id_number_key",
    columns: &["id_number"],
}];

impl Entity for Student {
    type Field = StudentField;

    const TABLE: &'static str = "students";
    const NAME: &'static str = "Student";
    const ID: StudentField = StudentField::Id;

    fn id(&self) -> i32 {
        self.id
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new()
            .with(StudentField::Id, self.id)
            .with(StudentField::FirstName, &self.first_name)
            .with(StudentField::LastName, &self.last_name)
            .with(StudentField::DateOfBirth, self.date_of_birth)
            .with(StudentField::IdNumber, &self.id_number)
            .with(StudentField::Picture, self.picture.clone());
        self.audit.write(&mut record);
        record
    }

    fn from_record(record: &Record) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: record.int32("id")?,
            first_name: record.text("first_name")?,
            last_name: record.text("last_name")?,
            date_of_birth: record.date("date_of_birth")?,
            id_number: record.text("id_number")?,
            picture: record.optional_text("picture")?,
            audit: AuditStamp::read(record)?,
        })
    }

    fn constraints() -> &'static [Constraint] {
        CONSTRAINTS
    }
}

impl Audited for Student {
    const UPDATED_AT: StudentField = StudentField::UpdatedAt;
    const UPDATED_BY: StudentField = StudentField::UpdatedBy;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDto {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub id_number: String,
    #[serde(default)]
    pub picture: Option<String>,
}

impl From<Student> for StudentDto {
    fn from(student: Student) -> Self {
        Self {
            id: student.id,
            first_name: student.first_name,
            last_name: student.last_name,
            date_of_birth: student.date_of_birth,
            id_number: student.id_number,
            picture: student.picture,
        }
    }
}

/// Body of `POST /api/Student`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCreateDto {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub id_number: String,
    #[serde(default)]
    pub picture: Option<String>,
}

impl StudentCreateDto {
    pub fn into_student(self, now: DateTime<Utc>) -> Student {
        Student::new(
            self.first_name,
            self.last_name,
            self.date_of_birth,
            self.id_number,
            self.picture,
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_round_trip_with_missing_picture() {
        let student = Student {
            id: 3,
            ..Student::new(
                "Ada",
                "Lovelace",
                NaiveDate::from_ymd_opt(1815, 12, 10).unwrap(),
                "ID-3",
                None,
                Utc::now(),
            )
        };
        let record = student.to_record();
        assert!(record.get("picture").is_null());
        assert_eq!(Student::from_record(&record).unwrap(), student);
    }

    #[test]
    fn test_dto_uses_camel_case() {
        let json = serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "dateOfBirth": "1815-12-10",
            "idNumber": "ID-3"
        });
        let dto: StudentCreateDto = serde_json::from_value(json).unwrap();
        assert_eq!(dto.id_number, "ID-3");
        assert_eq!(dto.picture, None);
    }
}
