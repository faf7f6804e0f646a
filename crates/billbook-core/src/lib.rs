//! # billbook-core: Pure Invoice Logic for Billbook
//!
//! This crate is the **heart** of Billbook. It turns a catalog snapshot and a
//! set of requested quantities into priced line items, invoice totals with a
//! GST-style tax split, and a view model for document rendering. Everything
//! here is a pure function with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Billbook Data Flow                               │
//! │                                                                         │
//! │  raw quantities ──► lines::build_lines ──► invoice::InvoiceAggregator   │
//! │                                                   │                     │
//! │                                                   ▼                     │
//! │                                        tax::TaxSplitCalculator          │
//! │                                                   │                     │
//! │                          ┌────────────────────────┴──────────┐          │
//! │                          ▼                                   ▼          │
//! │                  InvoiceTotals + lines               InvoiceDocument    │
//! │                          │                          (view model)        │
//! │                          ▼                                              │
//! │   billbook-db: stock decrement + invoice record in ONE transaction      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, LineItem, InvoiceRecord, ...)
//! - [`money`] - Money and Quantity types over exact decimals
//! - [`tax`] - Tax rate, tax configuration and the tax split calculator
//! - [`lines`] - Invoice line builder
//! - [`invoice`] - Aggregator and the invoice document view model
//! - [`words`] - Amount in words for the printed invoice
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use billbook_core::money::Money;
//! use billbook_core::tax::{TaxConfig, TaxSplitCalculator};
//!
//! let calculator = TaxSplitCalculator::new(TaxConfig::default());
//! let split = calculator.split(Money::from_major(1180), true).rounded();
//!
//! assert_eq!(split.taxable_base, Money::from_major(1000));
//! assert_eq!(split.same_origin_half, Money::from_major(90));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod lines;
pub mod money;
pub mod tax;
pub mod types;
pub mod validation;
pub mod words;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use money::{Money, Quantity};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default supplier jurisdiction (state code 37, Andhra Pradesh).
///
/// Invoices for customers with the same code get the CGST + SGST pair,
/// everyone else gets IGST.
pub const DEFAULT_SUPPLIER_JURISDICTION: &str = "37";

/// Default GST rate in basis points (18%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 1800;

/// Extension used when a renderer does not name its own.
pub const DEFAULT_DOCUMENT_EXTENSION: &str = "pdf";
