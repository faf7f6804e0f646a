//! # Domain Types
//!
//! Core domain types used throughout Billbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    LineItem     │   │  InvoiceRecord  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │──►│  product_id     │   │  id (UUID)      │       │
//! │  │  code           │   │  quantity       │   │  invoice_number │       │
//! │  │  hsn / uom      │   │  rate (frozen)  │   │  grand_total    │       │
//! │  │  rate / stock   │   │  amount         │   │  document_ref   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  InvoiceMeta    │   │   StockDelta    │   │   StockPolicy   │       │
//! │  │  number, date   │   │  before/after   │   │  AllowNegative  │       │
//! │  │  customer, code │   │  per product    │   │  RejectNegative │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations and raw input keys
//! - Business ID: (code, invoice_number) - human-readable

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{Money, Quantity};

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Product code - business identifier printed on the invoice.
    pub code: String,

    /// Display name printed on the invoice.
    pub name: String,

    /// Tax classification code (HSN). Printed for compliance, never used in
    /// computation.
    pub hsn: String,

    /// Unit of measure (NOS, KG, LTR, ...).
    pub uom: String,

    /// Unit rate, inclusive of tax.
    pub rate: Money,

    /// Quantity on hand.
    pub stock: Quantity,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for adding a product to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub hsn: String,
    pub uom: String,
    pub rate: Money,
    pub opening_stock: Quantity,
}

// =============================================================================
// Line Item
// =============================================================================

/// One sold product on an invoice.
///
/// Uses the snapshot pattern: code, name and rate are frozen at the moment
/// the line is built, so a later catalog change cannot reprice the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_id: String,
    /// Code at time of sale (frozen).
    pub code: String,
    /// Name at time of sale (frozen).
    pub name: String,
    pub hsn: String,
    pub uom: String,
    /// Quantity sold, always > 0.
    pub quantity: Quantity,
    /// Unit rate at time of sale (frozen).
    pub rate: Money,
    /// quantity × rate, unrounded.
    pub amount: Money,
}

impl LineItem {
    /// Builds a line from a product, capturing its current rate.
    ///
    /// Fails when rate × quantity does not fit a decimal.
    pub fn from_product(product: &Product, quantity: Quantity) -> Result<Self, ValidationError> {
        let amount = product.rate.checked_mul(quantity).ok_or_else(|| {
            ValidationError::invalid(
                format!("quantity for {}", product.code),
                format!("{} at rate {} is out of range", quantity, product.rate),
            )
        })?;

        Ok(LineItem {
            product_id: product.id.clone(),
            code: product.code.clone(),
            name: product.name.clone(),
            hsn: product.hsn.clone(),
            uom: product.uom.clone(),
            quantity,
            rate: product.rate,
            amount,
        })
    }
}

// =============================================================================
// Invoice Meta
// =============================================================================

/// Caller-supplied invoice header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceMeta {
    /// Invoice number. Free-form; uniqueness is opt-in at the ledger.
    pub number: String,
    pub date: NaiveDate,
    pub customer_name: String,
    /// Customer jurisdiction (state) code, compared against the supplier's.
    pub customer_jurisdiction: String,
}

// =============================================================================
// Invoice Record
// =============================================================================

/// The persisted, immutable summary of a committed invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceRecord {
    pub id: String,
    pub invoice_number: String,
    #[ts(as = "String")]
    pub invoice_date: NaiveDate,
    pub customer_name: String,
    /// Always rounded to 2 decimal places.
    pub grand_total: Money,
    /// Name of the rendered document in storage.
    pub document_ref: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock Reconciliation Types
// =============================================================================

/// What to do when a sale exceeds the quantity on hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// Always decrement; stock may go negative.
    #[default]
    AllowNegative,
    /// Reject the whole invoice if any line would go negative.
    RejectNegative,
}

/// The change one committed line made to a product's stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDelta {
    pub product_id: String,
    pub code: String,
    pub quantity: Quantity,
    pub before: Quantity,
    pub after: Quantity,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(rate: Money) -> Product {
        Product {
            id: "p-1".to_string(),
            code: "RICE-25".to_string(),
            name: "Rice 25kg".to_string(),
            hsn: "1006".to_string(),
            uom: "KG".to_string(),
            rate,
            stock: Quantity::from_units(10),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_line_item_rejects_amount_past_decimal_range() {
        let p = product(Money::from_major(50));
        let qty: Quantity = "79228162514264337593543950335".parse().unwrap();

        let err = LineItem::from_product(&p, qty).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidFormat { ref field, .. } if field == "quantity for RICE-25"
        ));
    }

    #[test]
    fn test_line_item_freezes_rate() {
        let mut p = product(Money::from_major(50));
        let line = LineItem::from_product(&p, Quantity::new(dec!(2.5))).unwrap();

        p.rate = Money::from_major(60);

        assert_eq!(line.rate, Money::from_major(50));
        assert_eq!(line.amount, Money::from_major(125));
        assert_eq!(line.code, "RICE-25");
    }

    #[test]
    fn test_stock_policy_default() {
        assert_eq!(StockPolicy::default(), StockPolicy::AllowNegative);
    }

    #[test]
    fn test_stock_policy_serde_names() {
        let json = serde_json::to_string(&StockPolicy::RejectNegative).unwrap();
        assert_eq!(json, "\"reject_negative\"");
    }
}
