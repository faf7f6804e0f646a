//! # Invoice Module
//!
//! The invoice aggregator and the document view model handed to renderers.
//!
//! ## Totals
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines ──► subtotal (sum in line order, unrounded)                      │
//! │                 │                                                       │
//! │                 ├──► TaxSplitCalculator ──► base, CGST, SGST, IGST      │
//! │                 │                           (each rounded on its own)   │
//! │                 │                                                       │
//! │                 └──► grand total = round(subtotal)                      │
//! │                                                                         │
//! │  The grand total is NOT rebuilt from the rounded components, so        │
//! │  base + taxes may differ from it by up to 0.01 per component.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::tax::{TaxSplit, TaxSplitCalculator};
use crate::types::{InvoiceMeta, LineItem};
use crate::words::amount_in_words;

// =============================================================================
// Invoice Totals
// =============================================================================

/// Monetary summary of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    /// Sum of line amounts, unrounded.
    pub subtotal: Money,
    /// Tax-exclusive value, rounded to 2 dp.
    pub taxable_base: Money,
    /// Tax components, each rounded to 2 dp.
    pub tax: TaxSplit,
    /// Subtotal rounded to 2 dp.
    pub grand_total: Money,
}

/// Sums line items and applies the tax split.
#[derive(Debug, Clone, Default)]
pub struct InvoiceAggregator {
    calculator: TaxSplitCalculator,
}

impl InvoiceAggregator {
    pub fn new(calculator: TaxSplitCalculator) -> Self {
        InvoiceAggregator { calculator }
    }

    pub fn calculator(&self) -> &TaxSplitCalculator {
        &self.calculator
    }

    /// Computes the totals for `lines`.
    ///
    /// Zero lines give all-zero totals. The only failure is a subtotal past
    /// the decimal range.
    pub fn aggregate(&self, lines: &[LineItem], is_same_origin: bool) -> CoreResult<InvoiceTotals> {
        let subtotal = Money::checked_sum(lines.iter().map(|line| line.amount))
            .ok_or_else(|| CoreError::out_of_range("Invoice subtotal"))?;
        let split = self.calculator.split(subtotal, is_same_origin).rounded();

        Ok(InvoiceTotals {
            subtotal,
            taxable_base: split.taxable_base,
            tax: split,
            grand_total: subtotal.round_currency(),
        })
    }
}

// =============================================================================
// Document Naming
// =============================================================================

/// Name of the stored document for an invoice, `{number}.{extension}`.
///
/// ```rust
/// use billbook_core::invoice::document_name;
///
/// assert_eq!(document_name("INV-001", "pdf"), "INV-001.pdf");
/// assert_eq!(document_name("INV-001", ".txt"), "INV-001.txt");
/// ```
pub fn document_name(invoice_number: &str, extension: &str) -> String {
    format!(
        "{}.{}",
        invoice_number.trim(),
        extension.trim_start_matches('.')
    )
}

// =============================================================================
// Invoice Document (view model)
// =============================================================================

/// Supplier details printed in the document header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SupplierDetails {
    pub name: String,
    pub address: String,
    /// Supplier jurisdiction (state) code.
    pub jurisdiction: String,
    /// Tax registration number (GSTIN).
    pub gstin: String,
}

/// Which tax components an invoice carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxOrigin {
    /// CGST + SGST.
    SameOrigin,
    /// IGST.
    CrossOrigin,
}

impl TaxOrigin {
    pub fn from_same_origin(is_same_origin: bool) -> Self {
        if is_same_origin {
            TaxOrigin::SameOrigin
        } else {
            TaxOrigin::CrossOrigin
        }
    }
}

/// Everything a renderer needs to produce the printed invoice.
///
/// Renderers consume this and nothing else; they never recompute money.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceDocument {
    pub supplier: SupplierDetails,
    pub invoice_number: String,
    #[ts(as = "String")]
    pub invoice_date: NaiveDate,
    /// Time of issue, `HH:MM:SS`.
    pub invoice_time: String,
    pub customer_name: String,
    pub customer_jurisdiction: String,
    pub origin: TaxOrigin,
    pub lines: Vec<LineItem>,
    pub taxable_value: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    pub grand_total: Money,
    pub amount_in_words: String,
    pub document_name: String,
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
}

impl InvoiceDocument {
    /// Assembles the view model from already-computed parts.
    pub fn build(
        supplier: SupplierDetails,
        meta: &InvoiceMeta,
        lines: Vec<LineItem>,
        totals: &InvoiceTotals,
        is_same_origin: bool,
        document_name: String,
        generated_at: DateTime<Utc>,
    ) -> Self {
        InvoiceDocument {
            supplier,
            invoice_number: meta.number.clone(),
            invoice_date: meta.date,
            invoice_time: generated_at.format("%H:%M:%S").to_string(),
            customer_name: meta.customer_name.clone(),
            customer_jurisdiction: meta.customer_jurisdiction.clone(),
            origin: TaxOrigin::from_same_origin(is_same_origin),
            lines,
            taxable_value: totals.taxable_base,
            cgst: totals.tax.cgst(),
            sgst: totals.tax.sgst(),
            igst: totals.tax.igst(),
            grand_total: totals.grand_total,
            amount_in_words: amount_in_words(totals.grand_total),
            document_name,
            generated_at,
        }
    }

    /// Total of the printed tax components.
    pub fn total_tax(&self) -> Money {
        self.cgst + self.sgst + self.igst
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Quantity;
    use crate::tax::TaxConfig;
    use crate::types::Product;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn aggregator() -> InvoiceAggregator {
        InvoiceAggregator::new(TaxSplitCalculator::new(TaxConfig::default()))
    }

    fn product(code: &str, rate: Money) -> Product {
        Product {
            id: format!("id-{}", code),
            code: code.to_string(),
            name: code.to_string(),
            hsn: "1006".to_string(),
            uom: "NOS".to_string(),
            rate,
            stock: Quantity::from_units(100),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(rate: Money, qty: Quantity) -> LineItem {
        LineItem::from_product(&product("X", rate), qty).unwrap()
    }

    fn meta(jurisdiction: &str) -> InvoiceMeta {
        InvoiceMeta {
            number: "INV-001".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            customer_name: "Sri Traders".to_string(),
            customer_jurisdiction: jurisdiction.to_string(),
        }
    }

    #[test]
    fn test_same_origin_invoice_of_1180() {
        let lines = vec![line(Money::from_major(590), Quantity::from_units(2))];
        let totals = aggregator().aggregate(&lines, true).unwrap();

        assert_eq!(totals.subtotal, Money::from_major(1180));
        assert_eq!(totals.taxable_base, Money::from_major(1000));
        assert_eq!(totals.tax.cgst(), Money::from_major(90));
        assert_eq!(totals.tax.sgst(), Money::from_major(90));
        assert_eq!(totals.tax.igst(), Money::ZERO);
        assert_eq!(totals.grand_total, Money::from_major(1180));
    }

    #[test]
    fn test_cross_origin_invoice_of_1180() {
        let lines = vec![
            line(Money::from_major(1000), Quantity::from_units(1)),
            line(Money::from_major(180), Quantity::from_units(1)),
        ];
        let totals = aggregator().aggregate(&lines, false).unwrap();

        assert_eq!(totals.taxable_base, Money::from_major(1000));
        assert_eq!(totals.tax.igst(), Money::from_major(180));
        assert!(totals.tax.cgst().is_zero());
    }

    #[test]
    fn test_zero_lines_zero_totals() {
        let totals = aggregator().aggregate(&[], true).unwrap();
        assert_eq!(totals, InvoiceTotals::default());
    }

    #[test]
    fn test_grand_total_not_rebuilt_from_components() {
        let lines = vec![line(Money::from_major(100), Quantity::from_units(1))];
        let totals = aggregator().aggregate(&lines, true).unwrap();

        assert_eq!(totals.grand_total, Money::from_major(100));
        assert_eq!(
            totals.taxable_base + totals.tax.total_tax(),
            Money::new(dec!(100.01))
        );
    }

    #[test]
    fn test_subtotal_past_decimal_range_is_an_error() {
        let big = Money::new(rust_decimal::Decimal::MAX);
        let mut first = line(Money::from_major(1), Quantity::from_units(1));
        first.amount = big;
        let second = line(Money::from_major(1), Quantity::from_units(1));

        let err = aggregator().aggregate(&[first, second], true).unwrap_err();
        assert!(matches!(err, CoreError::OutOfRange { .. }));
    }

    #[test]
    fn test_fractional_quantity_subtotal_is_unrounded() {
        let lines = vec![line(Money::new(dec!(33.33)), Quantity::new(dec!(0.125)))];
        let totals = aggregator().aggregate(&lines, true).unwrap();

        assert_eq!(totals.subtotal, Money::new(dec!(4.16625)));
        assert_eq!(totals.grand_total, Money::new(dec!(4.17)));
    }

    #[test]
    fn test_document_view_model() {
        let lines = vec![line(Money::from_major(590), Quantity::from_units(2))];
        let totals = aggregator().aggregate(&lines, true).unwrap();
        let generated_at = Utc.with_ymd_and_hms(2024, 4, 1, 9, 5, 7).unwrap();

        let doc = InvoiceDocument::build(
            SupplierDetails::default(),
            &meta("37"),
            lines,
            &totals,
            true,
            document_name("INV-001", "pdf"),
            generated_at,
        );

        assert_eq!(doc.invoice_time, "09:05:07");
        assert_eq!(doc.origin, TaxOrigin::SameOrigin);
        assert_eq!(doc.cgst, Money::from_major(90));
        assert_eq!(doc.total_tax(), Money::from_major(180));
        assert_eq!(doc.amount_in_words, "One Thousand, One Hundred And Eighty Only");
        assert_eq!(doc.document_name, "INV-001.pdf");
    }

    #[test]
    fn test_document_name_trims() {
        assert_eq!(document_name(" INV-9 ", "txt"), "INV-9.txt");
    }

    fn arb_line() -> impl Strategy<Value = LineItem> {
        (0i64..1_000_000, 1i64..10_000).prop_map(|(rate_minor, qty_milli)| {
            line(
                Money::from_minor(rate_minor),
                Quantity::new(rust_decimal::Decimal::new(qty_milli, 3)),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_line_sum_matches_grand_total(lines in prop::collection::vec(arb_line(), 0..20)) {
            let totals = aggregator().aggregate(&lines, true).unwrap();
            let line_sum = Money::checked_sum(lines.iter().map(|l| l.amount)).unwrap();

            prop_assert!(line_sum.within(totals.grand_total, Money::from_minor(1)));
        }

        #[test]
        fn prop_components_within_drift(lines in prop::collection::vec(arb_line(), 1..20), same in any::<bool>()) {
            let totals = aggregator().aggregate(&lines, same).unwrap();
            let rebuilt = totals.taxable_base + totals.tax.total_tax();

            prop_assert!(rebuilt.within(totals.grand_total, Money::from_minor(3)));
        }
    }
}
