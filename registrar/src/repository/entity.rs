//! Entity description consumed by the generic repository and the stores
//!
//! An [`Entity`] is a persisted record with a store-assigned integer id. Each
//! entity carries a field enum implementing [`Field`], so filters, ordering
//! and setters can only name columns that exist. The Postgres store decodes
//! rows with the entity's `sqlx::FromRow` impl; the in-memory store keeps
//! rows as [`Record`]s and converts through [`Entity::to_record`] and
//! [`Entity::from_record`].

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;

use super::error::{RepositoryError, RepositoryOperation};
use super::filter::FieldValue;

/// A column of an entity's table.
pub trait Field: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every column, in table order
    const ALL: &'static [Self];

    /// Column name in the store
    fn column(self) -> &'static str;
}

/// Store-enforced constraint declared by an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// The combination of `columns` must be unique across rows
    Unique {
        name: &'static str,
        columns: &'static [&'static str],
    },
    /// `column` must hold the id of an existing row in `references`
    ForeignKey {
        name: &'static str,
        column: &'static str,
        references: &'static str,
    },
}

impl Constraint {
    /// Constraint name as it appears in the schema
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unique { name, .. } | Self::ForeignKey { name, .. } => name,
        }
    }
}

/// A persisted record type.
pub trait Entity:
    Clone + fmt::Debug + Send + Sync + Unpin + 'static + for<'r> sqlx::FromRow<'r, PgRow>
{
    /// Field enum naming this entity's columns
    type Field: Field;

    /// Table name
    const TABLE: &'static str;
    /// Display name used in errors and logs
    const NAME: &'static str;
    /// The identity column
    const ID: Self::Field;

    /// Store-assigned identity (0 before `add`)
    fn id(&self) -> i32;

    /// All columns of this entity, including the id
    fn to_record(&self) -> Record;

    /// Rebuild the entity from a full row
    fn from_record(record: &Record) -> Result<Self, RepositoryError>;

    /// Unique and foreign-key constraints on the table
    fn constraints() -> &'static [Constraint] {
        &[]
    }
}

/// Entities that carry the audit block and stamp it on every update.
pub trait Audited: Entity {
    const UPDATED_AT: Self::Field;
    const UPDATED_BY: Self::Field;
}

/// One row as column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(BTreeMap<&'static str, FieldValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert keyed by a typed field
    #[must_use]
    pub fn with<F: Field>(mut self, field: F, value: impl Into<FieldValue>) -> Self {
        self.0.insert(field.column(), value.into());
        self
    }

    pub fn set(&mut self, column: &'static str, value: FieldValue) {
        self.0.insert(column, value);
    }

    pub fn remove(&mut self, column: &str) -> Option<FieldValue> {
        self.0.remove(column)
    }

    /// Value of `column`; a missing column reads as NULL.
    pub fn get(&self, column: &str) -> &FieldValue {
        self.0.get(column).unwrap_or(&FieldValue::Null)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.0.iter().map(|(column, value)| (*column, value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn integer(&self, column: &str) -> Result<i64, RepositoryError> {
        match self.get(column) {
            FieldValue::Integer(n) => Ok(*n),
            other => Err(mismatch(column, "integer", other)),
        }
    }

    pub fn int32(&self, column: &str) -> Result<i32, RepositoryError> {
        let value = self.integer(column)?;
        i32::try_from(value).map_err(|_| {
            RepositoryError::serialization_error(
                RepositoryOperation::Query,
                format!("Column '{}' value {} does not fit in int4", column, value),
            )
        })
    }

    pub fn text(&self, column: &str) -> Result<String, RepositoryError> {
        match self.get(column) {
            FieldValue::Text(s) => Ok(s.clone()),
            other => Err(mismatch(column, "text", other)),
        }
    }

    pub fn optional_text(&self, column: &str) -> Result<Option<String>, RepositoryError> {
        match self.get(column) {
            FieldValue::Null => Ok(None),
            FieldValue::Text(s) => Ok(Some(s.clone())),
            other => Err(mismatch(column, "text", other)),
        }
    }

    pub fn date(&self, column: &str) -> Result<NaiveDate, RepositoryError> {
        match self.get(column) {
            FieldValue::Date(d) => Ok(*d),
            other => Err(mismatch(column, "date", other)),
        }
    }

    pub fn timestamp(&self, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
        match self.get(column) {
            FieldValue::Timestamp(ts) => Ok(*ts),
            other => Err(mismatch(column, "timestamp", other)),
        }
    }
}

fn mismatch(column: &str, expected: &str, found: &FieldValue) -> RepositoryError {
    RepositoryError::serialization_error(
        RepositoryOperation::Query,
        format!(
            "Column '{}' expected {} but holds {}",
            column,
            expected,
            found.type_name()
        ),
    )
}
