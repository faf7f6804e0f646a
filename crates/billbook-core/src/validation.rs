//! # Validation Module
//!
//! Input validation utilities for Billbook.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request handler (outside this workspace)                     │
//! │  └── Form fields arrive as strings                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Invoice header: number, date, customer, jurisdiction              │
//! │  ├── Line quantities (used by the line builder)                        │
//! │  └── Catalog input: code, name, rate, stock                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use billbook_core::validation::{validate_code, parse_invoice_date};
//!
//! assert!(validate_code("RICE-25").is_ok());
//! assert!(parse_invoice_date("2024-03-31").is_ok());
//! assert!(parse_invoice_date("31/03/2024").is_err());
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::{Money, Quantity};
use crate::types::{InvoiceMeta, NewProduct};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of an invoice number.
pub const MAX_INVOICE_NUMBER_LEN: usize = 64;

/// Maximum length of a product code.
pub const MAX_CODE_LEN: usize = 50;

/// Maximum length of names (product and customer).
pub const MAX_NAME_LEN: usize = 200;

fn required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

// =============================================================================
// Invoice Header
// =============================================================================

/// Validates an invoice number.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - No path separators or `..`: the number names the stored document
pub fn validate_invoice_number(number: &str) -> ValidationResult<()> {
    required("invoice number", number)?;
    max_len("invoice number", number, MAX_INVOICE_NUMBER_LEN)?;

    if number.contains('/') || number.contains('\\') || number.contains("..") {
        return Err(ValidationError::invalid(
            "invoice number",
            "must not contain '/', '\\' or '..'",
        ));
    }

    Ok(())
}

/// Parses an invoice date in `YYYY-MM-DD` form.
pub fn parse_invoice_date(raw: &str) -> ValidationResult<NaiveDate> {
    required("invoice date", raw)?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::invalid("invoice date", "expected YYYY-MM-DD"))
}

/// Validates and assembles an invoice header from raw request fields.
pub fn parse_invoice_meta(
    number: &str,
    date: &str,
    customer_name: &str,
    customer_jurisdiction: &str,
) -> ValidationResult<InvoiceMeta> {
    validate_invoice_number(number)?;
    let date = parse_invoice_date(date)?;
    required("customer name", customer_name)?;
    max_len("customer name", customer_name, MAX_NAME_LEN)?;
    required("customer jurisdiction", customer_jurisdiction)?;

    Ok(InvoiceMeta {
        number: number.trim().to_string(),
        date,
        customer_name: customer_name.trim().to_string(),
        customer_jurisdiction: customer_jurisdiction.trim().to_string(),
    })
}

// =============================================================================
// Quantities
// =============================================================================

/// Validates a quantity the caller intends to sell.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_line_quantity(field: &str, quantity: Quantity) -> ValidationResult<()> {
    if !quantity.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a restock quantity.
pub fn validate_restock_quantity(quantity: Quantity) -> ValidationResult<()> {
    validate_line_quantity("restock quantity", quantity)
}

// =============================================================================
// Catalog Input
// =============================================================================

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, numbers, hyphens and underscores only
pub fn validate_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();
    required("code", code)?;
    max_len("code", code, MAX_CODE_LEN)?;

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid(
            "code",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(())
}

/// Validates a unit rate. Zero is allowed (free items).
pub fn validate_rate(rate: Money) -> ValidationResult<()> {
    if rate.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "rate".to_string(),
        });
    }
    Ok(())
}

/// Validates a new catalog entry.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_code(&product.code)?;
    required("name", &product.name)?;
    max_len("name", &product.name, MAX_NAME_LEN)?;
    required("uom", &product.uom)?;
    validate_rate(product.rate)?;

    if product.opening_stock.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "opening stock".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
