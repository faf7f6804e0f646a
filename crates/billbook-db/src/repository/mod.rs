//! # Repository Module
//!
//! Database repository implementations for Billbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  InvoiceService                                                        │
//! │       │                                                                 │
//! │       │  db.products().list()                                          │
//! │       ▼                                                                 │
//! │  ProductRepository                   InvoiceRepository                 │
//! │  ├── list()                          ├── list()                        │
//! │  ├── get_by_id(id)                   ├── find_by_number(number)        │
//! │  ├── insert(new_product)             └── count()                       │
//! │  └── restock(id, qty)                                                  │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes that must be atomic with each other (stock decrement + invoice
//! record) are not here; they live in [`crate::reconcile`], which reuses the
//! connection-level helpers these modules expose to the crate.
//!
//! ## Decimal Columns
//! Amounts and quantities are TEXT. [`decimal_text`] writes the canonical
//! form and [`parse_column`] reads it back, reporting undecodable values as
//! [`DbError::CorruptValue`].

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{DbError, DbResult};

pub mod invoice;
pub mod product;

/// Canonical TEXT form of a decimal (trailing zeros kept as given).
pub(crate) fn decimal_text(value: Decimal) -> String {
    value.to_string()
}

/// Parses a TEXT column into a domain value.
pub(crate) fn parse_column<T: FromStr>(column: &str, raw: &str) -> DbResult<T> {
    raw.parse::<T>()
        .map_err(|_| DbError::corrupt(column, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use billbook_core::{Money, Quantity};
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_text_keeps_precision() {
        assert_eq!(decimal_text(dec!(4.16625)), "4.16625");
        assert_eq!(decimal_text(dec!(1180.00)), "1180.00");
    }

    #[test]
    fn test_parse_column() {
        let money: Money = parse_column("rate", "1180.00").unwrap();
        assert_eq!(money, Money::from_major(1180));

        let qty: Quantity = parse_column("stock", "2.5").unwrap();
        assert_eq!(qty, Quantity::new(dec!(2.5)));

        let err = parse_column::<Money>("rate", "1,180").unwrap_err();
        assert!(matches!(err, DbError::CorruptValue { .. }));
    }
}
