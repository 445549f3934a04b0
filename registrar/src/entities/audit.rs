//! Audit columns shared by every table

use chrono::{DateTime, Utc};

use crate::repository::{Record, RepositoryError};

/// Actor recorded in `created_by` / `updated_by` for every write
pub const SYSTEM_ACTOR: &str = "sys";

pub(crate) const CREATED_AT: &str = "created_at";
pub(crate) const UPDATED_AT: &str = "updated_at";
pub(crate) const CREATED_BY: &str = "created_by";
pub(crate) const UPDATED_BY: &str = "updated_by";

/// Who touched a row and when
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AuditStamp {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl AuditStamp {
    /// Stamp for a row created at `now` by the system actor
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            created_by: SYSTEM_ACTOR.to_string(),
            updated_by: SYSTEM_ACTOR.to_string(),
        }
    }

    pub(crate) fn write(&self, record: &mut Record) {
        record.set(CREATED_AT, self.created_at.into());
        record.set(UPDATED_AT, self.updated_at.into());
        record.set(CREATED_BY, self.created_by.clone().into());
        record.set(UPDATED_BY, self.updated_by.clone().into());
    }

    pub(crate) fn read(record: &Record) -> Result<Self, RepositoryError> {
        Ok(Self {
            created_at: record.timestamp(CREATED_AT)?,
            updated_at: record.timestamp(UPDATED_AT)?,
            created_by: record.text(CREATED_BY)?,
            updated_by: record.text(UPDATED_BY)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stamp_is_consistent() {
        let now = Utc::now();
        let stamp = AuditStamp::new(now);
        assert_eq!(stamp.created_at, stamp.updated_at);
        assert_eq!(stamp.created_by, SYSTEM_ACTOR);
        assert_eq!(stamp.updated_by, SYSTEM_ACTOR);
    }

    #[test]
    fn test_record_round_trip() {
        let stamp = AuditStamp::new(Utc::now());
        let mut record = Record::new();
        stamp.write(&mut record);
        assert_eq!(AuditStamp::read(&record).unwrap(), stamp);
    }
}
