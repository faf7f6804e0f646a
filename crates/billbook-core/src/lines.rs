//! # Invoice Line Builder
//!
//! Turns a catalog snapshot plus raw requested quantities into priced line
//! items.
//!
//! ## Selection by Quantity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The request carries a quantity field for EVERY product in the catalog. │
//! │  Leaving a field blank or 0 is how the user leaves a product out.       │
//! │                                                                         │
//! │  catalog order      raw input     outcome                               │
//! │  ─────────────      ─────────     ───────────────────────────────       │
//! │  RICE-25            "3"           Included(qty 3 @ rate now)            │
//! │  DAL-1              ""            SkippedAbsent                         │
//! │  OIL-5              "0"           SkippedAbsent                         │
//! │  SUGAR-1            "two"         SkippedInvalid("... not a number")    │
//! │  SALT-1             "-1"          SkippedInvalid("... positive")        │
//! │                                                                         │
//! │  Output lines follow catalog order; that order is the printed order.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use crate::error::ValidationError;
use crate::money::Quantity;
use crate::types::{LineItem, Product};
use crate::validation::validate_line_quantity;

/// Classification of one catalog product against the raw request.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// The product is sold on this invoice.
    Included(LineItem),
    /// No quantity, a blank quantity, or zero.
    SkippedAbsent,
    /// A quantity was given but cannot be used.
    SkippedInvalid(ValidationError),
}

impl LineOutcome {
    /// Returns the line if included.
    pub fn into_line(self) -> Option<LineItem> {
        match self {
            LineOutcome::Included(line) => Some(line),
            _ => None,
        }
    }
}

/// Field name used in validation errors for a product's quantity.
fn quantity_field(product: &Product) -> String {
    format!("quantity for {}", product.code)
}

/// Classifies a single product.
///
/// The rate is read from `product` here and nowhere later.
pub fn evaluate_line(product: &Product, raw: Option<&str>) -> LineOutcome {
    let field = quantity_field(product);

    let quantity = match raw.map(|r| Quantity::parse_input(&field, r)) {
        None | Some(Ok(None)) => return LineOutcome::SkippedAbsent,
        Some(Err(err)) => return LineOutcome::SkippedInvalid(err),
        Some(Ok(Some(qty))) => qty,
    };

    if quantity == Quantity::ZERO {
        return LineOutcome::SkippedAbsent;
    }

    let line = validate_line_quantity(&field, quantity)
        .and_then(|()| LineItem::from_product(product, quantity));

    match line {
        Ok(line) => LineOutcome::Included(line),
        Err(err) => LineOutcome::SkippedInvalid(err),
    }
}

/// Classifies every product in catalog order.
pub fn evaluate_lines<'a>(
    catalog: &'a [Product],
    raw_quantities: &HashMap<String, String>,
) -> Vec<(&'a Product, LineOutcome)> {
    catalog
        .iter()
        .map(|product| {
            let raw = raw_quantities.get(&product.id).map(String::as_str);
            (product, evaluate_line(product, raw))
        })
        .collect()
}

/// Builds the invoice lines, silently skipping absent and invalid quantities.
///
/// ## Example
/// ```rust
/// use std::collections::HashMap;
/// use billbook_core::lines::build_lines;
///
/// let lines = build_lines(&[], &HashMap::new());
/// assert!(lines.is_empty()); // an invoice with no sold items is valid here
/// ```
pub fn build_lines(catalog: &[Product], raw_quantities: &HashMap<String, String>) -> Vec<LineItem> {
    evaluate_lines(catalog, raw_quantities)
        .into_iter()
        .filter_map(|(_, outcome)| outcome.into_line())
        .collect()
}

/// Builds the invoice lines, failing on the first invalid quantity.
///
/// Absent quantities are still skipped.
pub fn build_lines_strict(
    catalog: &[Product],
    raw_quantities: &HashMap<String, String>,
) -> Result<Vec<LineItem>, ValidationError> {
    let mut lines = Vec::new();

    for (_, outcome) in evaluate_lines(catalog, raw_quantities) {
        match outcome {
            LineOutcome::Included(line) => lines.push(line),
            LineOutcome::SkippedAbsent => {}
            LineOutcome::SkippedInvalid(err) => return Err(err),
        }
    }

    Ok(lines)
}

/// Product ids in the request that are not in the catalog, sorted.
pub fn unknown_products(catalog: &[Product], raw_quantities: &HashMap<String, String>) -> Vec<String> {
    let mut unknown: Vec<String> = raw_quantities
        .keys()
        .filter(|id| !catalog.iter().any(|p| &p.id == *id))
        .cloned()
        .collect();
    unknown.sort();
    unknown
}

// =============================================================================
// Unit Tests
// =============================================================================
