//! # Domain Errors
//!
//! `CoreError` is what a business rule says when it refuses an invoice;
//! `ValidationError` is what a parser says about one bad field. The
//! persistence crate wraps `CoreError` unchanged so a stock shortfall found
//! inside a commit reaches the caller with the same message.
//!
//! ```text
//!   "abc" as qty ──► ValidationError::InvalidFormat
//!                         │ (#[from])
//!                         ▼
//!   stock 10, sell 12 ──► CoreError ──► DbError::Core ──► AppError
//! ```
//!
//! Tax math and aggregation are total over well-formed input; nothing in
//! [`crate::tax`] or [`crate::invoice`] returns an error.

use thiserror::Error;

use crate::money::Quantity;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A sale would drive on-hand stock below zero.
    ///
    /// Raised only under `StockPolicy::RejectNegative`, for the first line
    /// in invoice order that would go short. Nothing is applied.
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: Quantity,
        requested: Quantity,
    },

    /// The invoice number is already in the ledger.
    ///
    /// Only raised when invoice-number uniqueness is switched on.
    #[error("Invoice number '{0}' already exists")]
    DuplicateInvoiceNumber(String),

    /// An invoice with no sold lines was rejected by caller policy.
    #[error("Invoice has no line items")]
    EmptyInvoice,

    /// A total or a stock level left the decimal range. Nothing is applied.
    #[error("{what} is out of range")]
    OutOfRange { what: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// One field failed to parse or was out of range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Missing or blank after trimming.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Unparseable number or date.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl CoreError {
    pub fn out_of_range(what: impl Into<String>) -> Self {
        CoreError::OutOfRange { what: what.into() }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortfall_and_duplicate_messages() {
        let err = CoreError::InsufficientStock {
            code: "RICE-25".to_string(),
            available: Quantity::from_units(10),
            requested: Quantity::from_units(12),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for RICE-25: available 10, requested 12"
        );

        let err = CoreError::DuplicateInvoiceNumber("INV-001".to_string());
        assert_eq!(err.to_string(), "Invoice number 'INV-001' already exists");
    }

    #[test]
    fn test_field_error_messages() {
        let err = ValidationError::Required {
            field: "customer name".to_string(),
        };
        assert_eq!(err.to_string(), "customer name is required");

        let err = ValidationError::invalid("qty", "'abc' is not a number");
        assert_eq!(err.to_string(), "qty has invalid format: 'abc' is not a number");
    }

    #[test]
    fn test_field_error_lifts_into_core_error() {
        let validation_err = ValidationError::Required {
            field: "invoice number".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
