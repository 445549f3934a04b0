//! Postgres store over a shared `sqlx::PgPool`

use sqlx::PgPool;
use tracing::instrument;

use super::sql;
use crate::error::{DatabaseError, DatabaseErrorKind};
use crate::repository::{
    Entity, Filter, QuerySpec, Record, RepositoryError, RepositoryErrorKind, RepositoryOperation,
    RepositoryResult, Store, UpdateSet,
};

/// Executes one statement per call on a pooled connection.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Store for PgStore {
    #[instrument(skip_all, fields(table = E::TABLE))]
    async fn fetch<E: Entity>(&self, spec: &QuerySpec<E::Field>) -> RepositoryResult<Vec<E>> {
        let mut builder = sql::select::<E>(spec);
        tracing::trace!(sql = builder.sql(), "fetch");
        builder
            .build_query_as::<E>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| to_repository_error(e, RepositoryOperation::Query))
    }

    #[instrument(skip_all, fields(table = E::TABLE))]
    async fn count<E: Entity>(&self, filters: &[Filter<E::Field>]) -> RepositoryResult<u64> {
        let mut builder = sql::count::<E>(filters);
        tracing::trace!(sql = builder.sql(), "count");
        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| to_repository_error(e, RepositoryOperation::Count))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    #[instrument(skip_all, fields(table = E::TABLE))]
    async fn insert<E: Entity>(&self, record: Record) -> RepositoryResult<E> {
        let mut builder = sql::insert::<E>(&record);
        tracing::trace!(sql = builder.sql(), "insert");
        builder
            .build_query_as::<E>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| to_repository_error(e, RepositoryOperation::Add))
    }

    #[instrument(skip_all, fields(table = E::TABLE))]
    async fn update_where<E: Entity>(
        &self,
        filters: &[Filter<E::Field>],
        setters: &UpdateSet<E::Field>,
    ) -> RepositoryResult<u64> {
        let mut builder = sql::update::<E>(filters, setters);
        tracing::trace!(sql = builder.sql(), "update");
        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| to_repository_error(e, RepositoryOperation::UpdateWhere))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip_all, fields(table = E::TABLE))]
    async fn delete_where<E: Entity>(&self, filters: &[Filter<E::Field>]) -> RepositoryResult<u64> {
        let mut builder = sql::delete::<E>(filters);
        tracing::trace!(sql = builder.sql(), "delete");
        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| {
                refine_delete_error(to_repository_error(e, RepositoryOperation::DeleteById))
            })?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| to_repository_error(e, RepositoryOperation::Ping))
    }
}

fn to_repository_error(err: sqlx::Error, operation: RepositoryOperation) -> RepositoryError {
    from_database_error(DatabaseError::from(err), operation)
}

/// Classify a database failure for the repository caller.
pub(crate) fn from_database_error(
    err: DatabaseError,
    operation: RepositoryOperation,
) -> RepositoryError {
    let message = match err.context {
        Some(ref context) => format!("{} [{}]", err.message, context),
        None => err.message.clone(),
    };
    match err.kind {
        DatabaseErrorKind::ConstraintViolation => {
            RepositoryError::constraint_violation(operation, message)
        }
        DatabaseErrorKind::ConnectionFailed => RepositoryError::connection_failed(operation, message),
        DatabaseErrorKind::PoolExhausted => RepositoryError::timeout(operation, message),
        DatabaseErrorKind::TypeConversion => {
            RepositoryError::serialization_error(operation, message)
        }
        DatabaseErrorKind::QueryFailed
        | DatabaseErrorKind::Configuration
        | DatabaseErrorKind::Other => RepositoryError::database_error(operation, message),
    }
}

/// Only a foreign key can reject a plain `DELETE`.
fn refine_delete_error(err: RepositoryError) -> RepositoryError {
    if err.kind == RepositoryErrorKind::ConstraintViolation {
        RepositoryError::still_referenced(err.message)
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatabaseOperation;

    #[test]
    fn test_constraint_violation_keeps_constraint_name() {
        let err = DatabaseError::constraint_violation(DatabaseOperation::Query, "duplicate key")
            .add_context("students_id_number_key");
        let mapped = from_database_error(err, RepositoryOperation::Add);

        assert_eq!(mapped.kind, RepositoryErrorKind::ConstraintViolation);
        assert_eq!(mapped.operation, RepositoryOperation::Add);
        assert!(mapped.message.contains("students_id_number_key"));
    }

    #[test]
    fn test_pool_timeout_is_retriable() {
        let mapped = from_database_error(
            DatabaseError::from(sqlx::Error::PoolTimedOut),
            RepositoryOperation::Query,
        );
        assert_eq!(mapped.kind, RepositoryErrorKind::Timeout);
        assert!(mapped.is_retriable());
    }

    #[test]
    fn test_closed_pool_is_connection_failure() {
        let mapped = from_database_error(
            DatabaseError::from(sqlx::Error::PoolClosed),
            RepositoryOperation::Count,
        );
        assert_eq!(mapped.kind, RepositoryErrorKind::ConnectionFailed);
    }

    #[test]
    fn test_decode_failure_is_serialization_error() {
        let mapped = from_database_error(
            DatabaseError::from(sqlx::Error::ColumnNotFound("credits".to_string())),
            RepositoryOperation::Query,
        );
        assert_eq!(mapped.kind, RepositoryErrorKind::DatabaseError);

        let mapped = from_database_error(
            DatabaseError::new(
                DatabaseOperation::Query,
                DatabaseErrorKind::TypeConversion,
                "bad int",
            ),
            RepositoryOperation::Query,
        );
        assert_eq!(mapped.kind, RepositoryErrorKind::SerializationError);
    }

    #[test]
    fn test_foreign_key_on_delete_is_still_referenced() {
        let err = DatabaseError::constraint_violation(DatabaseOperation::Query, "violates foreign key")
            .add_context("enrollments_course_id_fkey");
        let mapped = refine_delete_error(from_database_error(err, RepositoryOperation::DeleteById));

        assert_eq!(mapped.kind, RepositoryErrorKind::StillReferenced);
        assert_eq!(mapped.operation, RepositoryOperation::DeleteById);
        assert!(mapped.message.contains("enrollments_course_id_fkey"));

        let timeout = refine_delete_error(from_database_error(
            DatabaseError::from(sqlx::Error::PoolTimedOut),
            RepositoryOperation::DeleteById,
        ));
        assert_eq!(timeout.kind, RepositoryErrorKind::Timeout);
    }
}
