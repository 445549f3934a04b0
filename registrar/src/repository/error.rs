//! Repository error types
//!
//! Every repository operation fails with a [`RepositoryError`] naming the
//! operation, a coarse [`RepositoryErrorKind`] and a human-readable message.
//! "Not found" is deliberately absent: a missing row shows up as an affected
//! count of zero or an empty result, never as an error.
//!
//! # Example
//!
//! ```rust,ignore
//! use registrar::repository::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
//!
//! let error = RepositoryError::cancelled(RepositoryOperation::Add);
//! assert!(error.is_cancelled());
//! ```

use std::fmt;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Materializing a composed query
    Query,
    /// Counting rows that match a query's filters
    Count,
    /// Inserting a new entity
    Add,
    /// Set-based partial update
    UpdateWhere,
    /// Deleting a single entity by id
    DeleteById,
    /// Liveness probe against the store
    Ping,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Count => write!(f, "count"),
            Self::Add => write!(f, "add"),
            Self::UpdateWhere => write!(f, "update_where"),
            Self::DeleteById => write!(f, "delete_by_id"),
            Self::Ping => write!(f, "ping"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Uniqueness, foreign-key or check constraint rejected the write
    ConstraintViolation,
    /// The row to delete is still referenced by another row
    StillReferenced,
    /// The caller's cancellation token fired before the store answered
    Cancelled,
    /// The setter list was empty or tried to change the identity column
    InvalidUpdate,
    /// Failed to reach the store
    ConnectionFailed,
    /// Connection pool or statement timed out
    Timeout,
    /// Underlying database error
    DatabaseError,
    /// A stored row could not be decoded into the entity
    SerializationError,
    /// Other unclassified error
    Other,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::StillReferenced => write!(f, "still_referenced"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::InvalidUpdate => write!(f, "invalid_update"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::SerializationError => write!(f, "serialization_error"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured repository error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The entity type involved (e.g. "Course")
    pub entity_type: Option<String>,
    /// The id of the entity involved, when one is known
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a constraint violation error
    pub fn constraint_violation(
        operation: RepositoryOperation,
        message: impl Into<String>,
    ) -> Self {
        Self::new(operation, RepositoryErrorKind::ConstraintViolation, message)
    }

    /// A delete refused because a foreign key still points at the row
    pub fn still_referenced(message: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::DeleteById,
            RepositoryErrorKind::StillReferenced,
            message,
        )
    }

    /// Create a cancellation error
    pub fn cancelled(operation: RepositoryOperation) -> Self {
        Self::new(
            operation,
            RepositoryErrorKind::Cancelled,
            "Operation cancelled before the store completed it",
        )
    }

    /// Create an invalid update error (raised before any store call)
    pub fn invalid_update(message: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::UpdateWhere,
            RepositoryErrorKind::InvalidUpdate,
            message,
        )
    }

    /// Create a connection failed error
    pub fn connection_failed(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ConnectionFailed, message)
    }

    /// Create a timeout error
    pub fn timeout(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Timeout, message)
    }

    /// Create a database error
    pub fn database_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::DatabaseError, message)
    }

    /// Create a serialization error
    pub fn serialization_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::SerializationError, message)
    }

    /// Attach the entity type
    #[must_use]
    pub fn for_entity(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Attach entity type and id
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Override the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether the caller's cancellation token caused this error
    pub fn is_cancelled(&self) -> bool {
        self.kind == RepositoryErrorKind::Cancelled
    }

    /// Transient failures a caller may choose to retry.
    ///
    /// The repository itself never retries.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout
        )
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, &self.entity_id) {
            (Some(entity_type), Some(entity_id)) => write!(f, " [{}: {}]", entity_type, entity_id)?,
            (Some(entity_type), None) => write!(f, " [{}]", entity_type)?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_display() {
        assert_eq!(RepositoryOperation::Query.to_string(), "query");
        assert_eq!(RepositoryOperation::Count.to_string(), "count");
        assert_eq!(RepositoryOperation::Add.to_string(), "add");
        assert_eq!(RepositoryOperation::UpdateWhere.to_string(), "update_where");
        assert_eq!(RepositoryOperation::DeleteById.to_string(), "delete_by_id");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(
            RepositoryErrorKind::ConstraintViolation.to_string(),
            "constraint_violation"
        );
        assert_eq!(RepositoryErrorKind::Cancelled.to_string(), "cancelled");
        assert_eq!(RepositoryErrorKind::InvalidUpdate.to_string(), "invalid_update");
        assert_eq!(RepositoryErrorKind::StillReferenced.to_string(), "still_referenced");
    }

    #[test]
    fn test_still_referenced_is_a_delete_failure() {
        let error = RepositoryError::still_referenced("enrollments_course_id_fkey");
        assert_eq!(error.operation, RepositoryOperation::DeleteById);
        assert!(!error.is_retriable());
        assert!(!error.is_cancelled());
    }

    #[test]
    fn test_cancelled_convenience() {
        let error = RepositoryError::cancelled(RepositoryOperation::DeleteById);
        assert!(error.is_cancelled());
        assert!(!error.is_retriable());
        assert_eq!(error.operation, RepositoryOperation::DeleteById);
    }

    #[test]
    fn test_invalid_update_is_update_where() {
        let error = RepositoryError::invalid_update("no setters");
        assert_eq!(error.operation, RepositoryOperation::UpdateWhere);
        assert_eq!(error.kind, RepositoryErrorKind::InvalidUpdate);
    }

    #[test]
    fn test_is_retriable() {
        assert!(RepositoryError::connection_failed(RepositoryOperation::Query, "refused").is_retriable());
        assert!(RepositoryError::timeout(RepositoryOperation::Add, "pool").is_retriable());
        assert!(
            !RepositoryError::constraint_violation(RepositoryOperation::Add, "fk").is_retriable()
        );
    }

    #[test]
    fn test_display_with_entity() {
        let error = RepositoryError::constraint_violation(RepositoryOperation::Add, "duplicate")
            .with_entity("Student", "42");
        let display = error.to_string();
        assert!(display.contains("constraint_violation"));
        assert!(display.contains("add"));
        assert!(display.contains("[Student: 42]"));
    }

    #[test]
    fn test_display_with_entity_type_only() {
        let error = RepositoryError::database_error(RepositoryOperation::Query, "syntax")
            .for_entity("Course");
        assert!(error.to_string().ends_with("[Course]"));
    }
}
