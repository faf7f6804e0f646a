//! # Application Error Type
//!
//! Unified error type returned by [`crate::service::InvoiceService`].
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ValidationError ──► CoreError ──► DbError ──► AppError { code, msg }  │
//! │   (bad input)        (business)    (commit)        │                    │
//! │                                                    ▼                    │
//! │                                      CLI prints "[CODE] message"        │
//! │                                      JSON callers get                   │
//! │                                      { "code": ..., "message": ... }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistence failures keep their detail in the logs; the caller only
//! learns that the invoice was not created and stock is unchanged.

use serde::Serialize;

use billbook_core::{CoreError, ValidationError};
use billbook_db::DbError;

use crate::config::ConfigError;
use crate::document::DocumentError;

/// Error returned from service operations.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for DAL-1: available 2, requested 5"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product or invoice not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Hardened stock policy rejected the invoice
    InsufficientStock,

    /// Invoice number already in the ledger
    DuplicateInvoice,

    /// Invoice had no lines and the policy rejects empty invoices
    EmptyInvoice,

    /// A product code is already taken
    Conflict,

    /// Database operation failed; nothing was applied
    DatabaseError,

    /// Stored document could not be read
    DocumentError,

    /// Configuration could not be loaded
    ConfigError,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        AppError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => AppError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => AppError::new(
                ErrorCode::Conflict,
                format!("Duplicate {}: '{}' already exists", field, value),
            ),
            DbError::Core(core) => AppError::from(core),
            corrupt @ DbError::CorruptValue { .. } => {
                tracing::error!(error = %corrupt, "Stored value could not be decoded");
                AppError::new(ErrorCode::DatabaseError, "Stored data is corrupt")
            }
            other => {
                tracing::error!(error = %other, "Database error");
                AppError::new(
                    ErrorCode::DatabaseError,
                    "A database error occurred; nothing was changed",
                )
            }
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::DuplicateInvoiceNumber(_) => ErrorCode::DuplicateInvoice,
            CoreError::EmptyInvoice => ErrorCode::EmptyInvoice,
            CoreError::OutOfRange { .. } => ErrorCode::ValidationError,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        AppError::new(code, err.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::NotFound(name) => AppError::not_found("Document", &name),
            invalid @ DocumentError::InvalidName(_) => AppError::validation(invalid.to_string()),
            other => AppError::new(ErrorCode::DocumentError, other.to_string()),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

/// Result type for service operations.
pub type AppResult<T> = Result<T, AppError>;
