//! Service error type and structured database errors

use std::fmt;
use thiserror::Error;

/// Phase of a database interaction that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseOperation {
    /// Opening the pool at startup
    Connect,
    /// Running a statement
    Query,
    /// Waiting for a pooled connection
    PoolAcquire,
}

impl DatabaseOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Query => "query",
            Self::PoolAcquire => "pool_acquire",
        }
    }
}

impl fmt::Display for DatabaseOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a `sqlx` failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseErrorKind {
    ConnectionFailed,
    /// Unique, foreign-key or check constraint rejected the statement
    ConstraintViolation,
    QueryFailed,
    /// A column could not be decoded into the expected Rust type
    TypeConversion,
    /// Malformed connection URL or options
    Configuration,
    PoolExhausted,
    Other,
}

impl DatabaseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionFailed => "connection_failed",
            Self::ConstraintViolation => "constraint_violation",
            Self::QueryFailed => "query_failed",
            Self::TypeConversion => "type_conversion",
            Self::Configuration => "configuration",
            Self::PoolExhausted => "pool_exhausted",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DatabaseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `sqlx` failure with the phase it happened in.
///
/// `context` carries the violated constraint name for constraint errors and
/// the sanitized URL for connection errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseError {
    pub operation: DatabaseOperation,
    pub kind: DatabaseErrorKind,
    pub message: String,
    pub context: Option<String>,
}

impl DatabaseError {
    pub fn new(
        operation: DatabaseOperation,
        kind: DatabaseErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            context: None,
        }
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(
            DatabaseOperation::Connect,
            DatabaseErrorKind::ConnectionFailed,
            message,
        )
    }

    pub fn constraint_violation(operation: DatabaseOperation, message: impl Into<String>) -> Self {
        Self::new(operation, DatabaseErrorKind::ConstraintViolation, message)
    }

    pub fn pool_exhausted(message: impl Into<String>) -> Self {
        Self::new(
            DatabaseOperation::PoolAcquire,
            DatabaseErrorKind::PoolExhausted,
            message,
        )
    }

    /// Connection-level failures that may clear up on their own
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            DatabaseErrorKind::ConnectionFailed | DatabaseErrorKind::PoolExhausted
        )
    }

    #[must_use]
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Database {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref ctx) = self.context {
            write!(f, " [context: {}]", ctx)?;
        }
        Ok(())
    }
}

impl std::error::Error for DatabaseError {}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error as E;

        let (operation, kind) = match &err {
            E::PoolTimedOut => return Self::pool_exhausted("Connection pool timed out"),
            E::PoolClosed => return Self::connection_failed("Connection pool is closed"),
            E::WorkerCrashed => return Self::connection_failed("Database worker crashed"),
            E::Configuration(_) => (DatabaseOperation::Connect, DatabaseErrorKind::Configuration),
            E::Io(_) | E::Tls(_) => (
                DatabaseOperation::Connect,
                DatabaseErrorKind::ConnectionFailed,
            ),
            E::TypeNotFound { .. } | E::ColumnDecode { .. } | E::Decode(_) => {
                (DatabaseOperation::Query, DatabaseErrorKind::TypeConversion)
            }
            E::Database(db_err)
                if db_err.is_unique_violation()
                    || db_err.is_foreign_key_violation()
                    || db_err.is_check_violation() =>
            {
                (
                    DatabaseOperation::Query,
                    DatabaseErrorKind::ConstraintViolation,
                )
            }
            E::Database(_) | E::Protocol(_) | E::ColumnNotFound(_) | E::RowNotFound => {
                (DatabaseOperation::Query, DatabaseErrorKind::QueryFailed)
            }
            _ => (DatabaseOperation::Query, DatabaseErrorKind::Other),
        };

        let constraint = match &err {
            E::Database(db_err) => db_err.constraint().map(str::to_string),
            _ => None,
        };

        let error = Self::new(operation, kind, err.to_string());
        match constraint {
            Some(name) => error.add_context(name),
            None => error,
        }
    }
}

/// Strip credentials from a connection URL before it reaches a log line
pub fn sanitize_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}<redacted>@{}", &url[..scheme_end + 3], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

/// Result type alias using the service error
pub type Result<T> = std::result::Result<T, Error>;

/// Service-level error type
///
/// Raised while starting up (configuration, connecting the store, seeding
/// the admin) and by the auth primitives. Request handlers report failures
/// through [`ApiError`](crate::handlers::ApiError) instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    #[error("{0}")]
    Database(DatabaseError),

    /// Password hashing, token signing or admin seeding failed
    #[error("Auth error: {0}")]
    Auth(String),

    #[error("JWT error: {0}")]
    Jwt(Box<jsonwebtoken::errors::Error>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed credentials
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Input rejected by a validation rule
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Jwt(Box::new(err))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Database(DatabaseError::from(err))
    }
}

impl From<DatabaseError> for Error {
    fn from(err: DatabaseError) -> Self {
        Error::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retriable() {
        assert!(DatabaseError::connection_failed("down").is_retriable());
        assert!(DatabaseError::pool_exhausted("busy").is_retriable());
        assert!(
            !DatabaseError::constraint_violation(DatabaseOperation::Query, "dup").is_retriable()
        );
    }

    #[test]
    fn test_display_formatting_with_context() {
        let err = DatabaseError::constraint_violation(DatabaseOperation::Query, "duplicate key")
            .add_context("students_id_number_key");
        assert_eq!(
            err.to_string(),
            "Database constraint_violation error during query: duplicate key \
             [context: students_id_number_key]"
        );
    }

    #[test]
    fn test_sqlx_pool_timeout_maps_to_pool_exhausted() {
        let err = DatabaseError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind, DatabaseErrorKind::PoolExhausted);
        assert_eq!(err.operation, DatabaseOperation::PoolAcquire);
    }

    #[test]
    fn test_sqlx_row_not_found_is_a_query_failure() {
        let err = DatabaseError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.kind, DatabaseErrorKind::QueryFailed);
        assert!(err.context.is_none());
    }

    #[test]
    fn test_sanitize_url() {
        assert_eq!(
            sanitize_url("postgres://app:secret@db:5432/registrar"),
            "postgres://<redacted>@db:5432/registrar"
        );
        assert_eq!(sanitize_url("memory://"), "memory://");
        assert_eq!(
            sanitize_url("postgres://localhost/registrar"),
            "postgres://localhost/registrar"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::from(figment::Error::from("missing key".to_string()));
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
