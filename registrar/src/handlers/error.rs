//! API error types for handler operations
//!
//! Handlers return [`ApiError`], which maps to an HTTP status and a JSON
//! body via `IntoResponse`. Store failures are logged in full and returned
//! with an opaque message.
//!
//! # Example
//!
//! ```rust,ignore
//! use registrar::handlers::{ApiError, ApiErrorKind};
//!
//! let error = ApiError::not_found("Course", "course not found!", 42);
//! assert!(matches!(error.kind, ApiErrorKind::NotFound));
//! assert_eq!(error.entity_id, Some("42".to_string()));
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, ValidationIssue};
use crate::repository::{RepositoryError, RepositoryErrorKind, RepositoryOperation};

/// Non-standard status for a request abandoned by the client (nginx convention)
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Operation being performed when the API error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Listing a page of entities
    List,
    /// Getting a single entity by ID
    Get,
    /// Creating a new entity
    Create,
    /// Updating an existing entity
    Update,
    /// Deleting an entity
    Delete,
    /// Exchanging credentials for a token
    Login,
    /// Creating an account
    Register,
    /// Checking the bearer token on a gated route
    Authorize,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Get => write!(f, "get"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Login => write!(f, "login"),
            Self::Register => write!(f, "register"),
            Self::Authorize => write!(f, "authorize"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Entity was not found
    NotFound,
    /// Route id and body id disagree
    ValidationMismatch,
    /// Request validation failed; details are in `errors`
    ValidationFailed,
    /// Invalid request format or parameters
    BadRequest,
    /// Authentication required
    Unauthorized,
    /// Access denied
    Forbidden,
    /// The resource is still referenced and cannot be removed
    Conflict,
    /// The request was cancelled before the store answered
    Cancelled,
    /// Internal server error
    InternalError,
    /// Service temporarily unavailable
    ServiceUnavailable,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ValidationMismatch => write!(f, "validation_mismatch"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::Conflict => write!(f, "conflict"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::InternalError => write!(f, "internal_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
        }
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ValidationMismatch | Self::ValidationFailed | Self::BadRequest => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Cancelled => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::SERVICE_UNAVAILABLE),
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error code string for this error kind
    #[must_use]
    pub fn error_code(&self) -> String {
        format!("{}", self).to_uppercase()
    }
}

/// Structured API error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The operation being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "Course")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
    /// Individual rule failures for `ValidationFailed`
    pub errors: Vec<ValidationIssue>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
            errors: Vec::new(),
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(
        entity_type: impl Into<String>,
        message: impl Into<String>,
        entity_id: impl ToString,
    ) -> Self {
        Self::new(ApiOperation::Get, ApiErrorKind::NotFound, message)
            .with_entity(entity_type, entity_id.to_string())
    }

    /// Route id and body id disagree
    pub fn validation_mismatch(message: impl Into<String>) -> Self {
        Self::new(
            ApiOperation::Update,
            ApiErrorKind::ValidationMismatch,
            message,
        )
    }

    /// A list of failed validation rules
    pub fn validation_failed(operation: ApiOperation, errors: Vec<ValidationIssue>) -> Self {
        Self {
            errors,
            ..Self::new(
                operation,
                ApiErrorKind::ValidationFailed,
                "One or more validation errors occurred",
            )
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::List, ApiErrorKind::BadRequest, message)
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Authorize, ApiErrorKind::Unauthorized, message)
    }

    /// Create a forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Authorize, ApiErrorKind::Forbidden, message)
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Get, ApiErrorKind::InternalError, message)
    }

    /// Create a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Get, ApiErrorKind::ServiceUnavailable, message)
    }

    /// Add entity context to an existing error
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

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: ApiOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, ApiErrorKind::ServiceUnavailable)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(ref entity_type), Some(ref entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Response body for API errors
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub error: String,
    pub code: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationIssue>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        let code = self.kind.error_code();

        if status.is_server_error() {
            tracing::error!(
                operation = %self.operation,
                kind = %self.kind,
                entity_type = ?self.entity_type,
                entity_id = ?self.entity_id,
                retriable = self.is_retriable(),
                "API error: {}", self.message
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                kind = %self.kind,
                entity_type = ?self.entity_type,
                entity_id = ?self.entity_id,
                "API error: {}", self.message
            );
        }

        let response = ApiErrorResponse {
            error: self.message,
            code,
            status: status.as_u16(),
            operation: Some(self.operation.to_string()),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            errors: self.errors,
        };

        (status, Json(response)).into_response()
    }
}

fn repository_operation_to_api_operation(op: RepositoryOperation) -> ApiOperation {
    match op {
        RepositoryOperation::Query | RepositoryOperation::Count | RepositoryOperation::Ping => {
            ApiOperation::List
        }
        RepositoryOperation::Add => ApiOperation::Create,
        RepositoryOperation::UpdateWhere => ApiOperation::Update,
        RepositoryOperation::DeleteById => ApiOperation::Delete,
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        let operation = repository_operation_to_api_operation(err.operation);

        let kind = match err.kind {
            RepositoryErrorKind::Cancelled => ApiErrorKind::Cancelled,
            RepositoryErrorKind::InvalidUpdate => ApiErrorKind::BadRequest,
            RepositoryErrorKind::StillReferenced => ApiErrorKind::Conflict,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout => {
                ApiErrorKind::ServiceUnavailable
            }
            RepositoryErrorKind::ConstraintViolation
            | RepositoryErrorKind::DatabaseError
            | RepositoryErrorKind::SerializationError
            | RepositoryErrorKind::Other => ApiErrorKind::InternalError,
        };

        // details stay in the log
        let message = match kind {
            ApiErrorKind::ServiceUnavailable => "Service temporarily unavailable".to_string(),
            ApiErrorKind::Conflict => {
                tracing::debug!(entity_type = ?err.entity_type, "Delete refused: {}", err.message);
                match &err.entity_type {
                    Some(entity_type) => format!(
                        "{} is still referenced by other records and cannot be deleted.",
                        entity_type
                    ),
                    None => "Record is still referenced by other records and cannot be deleted."
                        .to_string(),
                }
            }
            ApiErrorKind::InternalError => {
                tracing::error!(
                    operation = %err.operation,
                    kind = %err.kind,
                    entity_type = ?err.entity_type,
                    "Repository error: {}", err.message
                );
                "An internal error occurred".to_string()
            }
            _ => err.message,
        };

        Self {
            operation,
            kind,
            message,
            entity_type: err.entity_type,
            entity_id: err.entity_id,
            errors: Vec::new(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(issues) => {
                Self::validation_failed(ApiOperation::Login, issues)
            }
            AuthError::Unauthorized => {
                Self::new(ApiOperation::Login, ApiErrorKind::Unauthorized, err.to_string())
            }
            AuthError::Repository(e) => Self::from(e),
            AuthError::Internal(message) => {
                tracing::error!("Authentication failure: {}", message);
                Self::internal("An internal error occurred").with_operation(ApiOperation::Login)
            }
        }
    }
}
