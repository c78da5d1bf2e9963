//! Error types for submission-pipeline
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (validation, external services, persistence)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//! - User-facing error categories for chat notifications

use crate::types::SubmissionId;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for submission-pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for submission-pipeline
///
/// Stage failures inside the submission processor all surface as this type so the
/// queue worker can decide between retry and terminal failure in one place.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "queue.max_attempts")
        key: Option<String>,
    },

    /// Malformed payload or input that can never succeed
    #[error("validation error: {0}")]
    Validation(String),

    /// A collaborator (extractor, text generator, image provider, Telegram) failed
    #[error("{service} error: {message}")]
    ExternalService {
        /// Name of the collaborator that failed
        service: String,
        /// What went wrong
        message: String,
    },

    /// A bounded external call did not finish in time
    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout {
        /// The operation that timed out
        operation: String,
        /// The bound that was exceeded
        after: Duration,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// The same source was already published
    #[error("duplicate submission: already published as submission {submission_id}")]
    Duplicate {
        /// The submission that already published this source
        submission_id: SubmissionId,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for an [`Error::ExternalService`]
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an [`Error::Config`] tied to a config key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Classify the error for user-facing notifications
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation(_) => ErrorCategory::Validation,
            Error::ExternalService { .. } | Error::Timeout { .. } | Error::Network(_) => {
                ErrorCategory::ExternalService
            }
            Error::Database(_) | Error::Sqlx(_) => ErrorCategory::Storage,
            Error::Duplicate { .. } => ErrorCategory::Duplicate,
            Error::Config { .. } => ErrorCategory::Configuration,
            Error::Io(_)
            | Error::NotFound(_)
            | Error::Serialization(_)
            | Error::ApiServerError(_)
            | Error::Other(_) => ErrorCategory::Internal,
        }
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),

    /// Constraint violation (e.g., duplicate key)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Coarse error classification shown to chat users
///
/// Internal error text never reaches the chat; only the category does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The submission itself was unusable
    Validation,
    /// An upstream service failed or timed out
    ExternalService,
    /// The store could not be reached
    Storage,
    /// The source was already published
    Duplicate,
    /// The service is misconfigured
    Configuration,
    /// Anything else
    Internal,
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "not found: job 123",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }

    /// Create a "service unavailable" error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new("service_unavailable", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Database(DatabaseError::NotFound(_)) => 404,

            // 409 Conflict
            Error::Duplicate { .. } => 409,
            Error::Database(DatabaseError::ConstraintViolation(_)) => 409,

            // 422 Unprocessable Entity
            Error::Validation(_) => 422,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::ExternalService { .. } => 502,
            Error::Network(_) => 502,

            // 504 Gateway Timeout
            Error::Timeout { .. } => 504,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::ExternalService { .. } => "external_service_error",
            Error::Timeout { .. } => "timeout",
            Error::Database(DatabaseError::NotFound(_)) => "not_found",
            Error::Database(DatabaseError::ConstraintViolation(_)) => "conflict",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Duplicate { .. } => "duplicate",
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Duplicate { submission_id } => Some(serde_json::json!({
                "submission_id": submission_id,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::ExternalService { service, .. } => Some(serde_json::json!({
                "service": service,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
