//! # Persistence Errors
//!
//! ```text
//!   sqlx::Error ─┐
//!                ├──► DbError ──► AppError (apps/billbook)
//!   CoreError  ──┘    (InsufficientStock, DuplicateInvoiceNumber raised
//!                      inside a commit travel through unchanged)
//! ```
//!
//! A `DbError` out of `StockReconciler::commit` means the transaction was
//! rolled back: no invoice row, no stock change.

use billbook_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// A lookup by id, code or invoice number matched nothing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the row, e.g. a second product with the
    /// same code. `field` is `table.column` as SQLite reports it.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Cannot open database: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// SQLite refused the statement (disk full, trigger abort, constraint
    /// other than UNIQUE).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No pool connection became free in time.
    #[error("Database busy")]
    Busy,

    /// A stored decimal did not parse back.
    #[error("Corrupt {column} value '{value}'")]
    CorruptValue { column: String, value: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn corrupt(column: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::CorruptValue {
            column: column.into(),
            value: value.into(),
        }
    }
}

const UNIQUE_PREFIX: &str = "UNIQUE constraint failed: ";

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                match msg.strip_prefix(UNIQUE_PREFIX) {
                    Some(field) => DbError::UniqueViolation {
                        field: field.to_string(),
                        value: String::new(),
                    },
                    None => DbError::QueryFailed(msg.to_string()),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::Busy,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
