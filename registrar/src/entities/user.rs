//! Accounts that can sign in

use chrono::{DateTime, Utc};

use super::audit::{self, AuditStamp};
use crate::repository::{Audited, Constraint, Entity, Field, Record, RepositoryError};

/// Role allowed to create, update and delete records
pub const ADMIN_ROLE: &str = "Admin";
/// Role given to self-registered accounts
pub const USER_ROLE: &str = "User";

#[derive(Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    /// Stored lowercased
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub role: String,
    #[sqlx(flatten)]
    pub audit: AuditStamp,
}

impl User {
    pub fn new(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            email: email.into(),
            password_hash: password_hash.into(),
            role: role.into(),
            audit: AuditStamp::new(now),
        }
    }

    pub fn roles(&self) -> Vec<String> {
        vec![self.role.clone()]
    }
}

// keep the hash out of logs
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Id,
    Email,
    PasswordHash,
    Role,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
}

impl Field for UserField {
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::Email,
        Self::PasswordHash,
        Self::Role,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::CreatedBy,
        Self::UpdatedBy,
    ];

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Email => "email",
            Self::PasswordHash => "password_hash",
            Self::Role => "role",
            Self::CreatedAt => audit::CREATED_AT,
            Self::UpdatedAt => audit::UPDATED_AT,
            Self::CreatedBy => audit::CREATED_BY,
            Self::UpdatedBy => audit::UPDATED_BY,
        }
    }
}

const CONSTRAINTS: &[Constraint] = &[Constraint::Unique {
    name: "users_email_key",
    columns: &["email"],
}];

impl Entity for User {
    type Field = UserField;

    const TABLE: &'static str = "users";
    const NAME: &'static str = "User";
    const ID: UserField = UserField::Id;

    fn id(&self) -> i32 {
        self.id
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new()
            .with(UserField::Id, self.id)
            .with(UserField::Email, &self.email)
            .with(UserField::PasswordHash, &self.password_hash)
            .with(UserField::Role, &self.role);
        self.audit.write(&mut record);
        record
    }

    fn from_record(record: &Record) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: record.int32("id")?,
            email: record.text("email")?,
            password_hash: record.text("password_hash")?,
            role: record.text("role")?,
            audit: AuditStamp::read(record)?,
        })
    }

    fn constraints() -> &'static [Constraint] {
        CONSTRAINTS
    }
}

impl Audited for User {
    const UPDATED_AT: UserField = UserField::UpdatedAt;
    const UPDATED_BY: UserField = UserField::UpdatedBy;
}
