//! # Money Module
//!
//! Provides the `Money` and `Quantity` types for handling invoice values.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    1180 / 1.18 = 999.9999999999999  ❌ WRONG!                           │
//! │                                                                         │
//! │  Quantities can be fractional (2.5 kg at 40.00/kg), so integer          │
//! │  paise alone cannot hold an unrounded line amount either.               │
//! │                                                                         │
//! │  OUR SOLUTION: exact decimals                                           │
//! │    1180 / 1.18 = 1000 exactly                                           │
//! │    Round to 2 places only for presentation, half to even                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use billbook_core::money::{Money, Quantity};
//!
//! let rate = Money::from_minor(5000);                            // 50.00
//! let amount = rate.checked_mul(Quantity::from_units(3));        // 150.00
//! assert_eq!(amount, Some(Money::from_major(150)));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// Decimal places used for every presented amount.
pub const CURRENCY_DECIMALS: u32 = 2;

/// Rounds to `dp` places with round-half-to-even (Bankers Rounding).
#[inline]
fn round_half_even(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven)
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the single invoice currency.
///
/// ## Design Decisions
/// - **Decimal**: exact base-10 arithmetic, no float drift
/// - **Unrounded by default**: line amounts and subtotals keep full precision;
///   only [`Money::round_currency`] produces a 2 dp presentation value
/// - **Serde as string**: `"1180.00"` survives JSON and SQLite TEXT untouched
///
/// ## User Workflow Context
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                    Where Money is Used                                  │
/// │                                                                         │
/// │  Product.rate ──► LineItem.rate ──► LineItem.amount ──► subtotal       │
/// │                                                            │            │
/// │                         TaxSplit (base, CGST, SGST, IGST) ◄┘            │
/// │                                                            │            │
/// │  InvoiceRecord.grand_total ◄── round_currency(subtotal) ◄──┘            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(#[ts(type = "string")] Decimal);

impl Money {
    /// Zero money value.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wraps a decimal amount.
    #[inline]
    pub const fn new(value: Decimal) -> Self {
        Money(value)
    }

    /// Creates a Money value from whole currency units.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(1180).to_string(), "1180.00");
    /// ```
    #[inline]
    pub fn from_major(major: i64) -> Self {
        Money(Decimal::from(major))
    }

    /// Creates a Money value from minor units (paise).
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    ///
    /// let rate = Money::from_minor(1099);
    /// assert_eq!(rate.to_string(), "10.99");
    /// ```
    #[inline]
    pub fn from_minor(minor: i64) -> Self {
        Money(Decimal::new(minor, CURRENCY_DECIMALS))
    }

    /// Returns the underlying decimal.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Strictly below zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Rounds to paise, ties to the even digit.
    ///
    /// A 2.5% CGST half on 5.00 is 0.125 and prints as 0.12; on 5.40 it is
    /// 0.135 and prints as 0.14. Half-up would push every tie the same way.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    /// use std::str::FromStr;
    ///
    /// let tax = Money::from_str("0.125").unwrap();
    /// assert_eq!(tax.round_currency(), Money::from_minor(12));
    /// ```
    #[inline]
    pub fn round_currency(&self) -> Self {
        Money(round_half_even(self.0, CURRENCY_DECIMALS))
    }

    /// Rounds to whole currency units (used for the amount in words).
    #[inline]
    pub fn round_whole(&self) -> Decimal {
        round_half_even(self.0, 0)
    }

    /// Divides by a decimal factor (e.g. `1 + rate`).
    #[inline]
    pub fn divide_by(&self, divisor: Decimal) -> Self {
        Money(self.0 / divisor)
    }

    /// Splits the value into two equal halves.
    ///
    /// Both halves are the same value; no remainder is assigned to either
    /// side. Rounding happens later, per component.
    #[inline]
    pub fn halve(&self) -> Self {
        Money(self.0 / Decimal::from(2))
    }

    /// Rate × quantity, or `None` past the decimal range.
    #[inline]
    pub fn checked_mul(&self, qty: Quantity) -> Option<Money> {
        self.0.checked_mul(qty.0).map(Money)
    }

    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Sums in iteration order, `None` on overflow.
    pub fn checked_sum<I>(values: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        values
            .into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }

    /// Checks whether two values agree within `tolerance`.
    pub fn within(&self, other: Money, tolerance: Money) -> bool {
        (self.0 - other.0).abs() <= tolerance.0
    }
}

// =============================================================================
// Quantity Type
// =============================================================================

/// A stock or sale quantity in the product's unit of measure.
///
/// Quantities are decimal because units like kg or litre sell in fractions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Quantity(#[ts(type = "string")] Decimal);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    /// Wraps a decimal quantity.
    #[inline]
    pub const fn new(value: Decimal) -> Self {
        Quantity(value)
    }

    /// Creates a whole-unit quantity.
    #[inline]
    pub fn from_units(units: i64) -> Self {
        Quantity(Decimal::from(units))
    }

    /// Returns the underlying decimal.
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Checks if the quantity is strictly positive.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the quantity is below zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    #[inline]
    pub fn checked_add(&self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }

    #[inline]
    pub fn checked_sub(&self, other: Quantity) -> Option<Quantity> {
        self.0.checked_sub(other.0).map(Quantity)
    }

    /// Parses user input, trimming whitespace.
    ///
    /// Returns `Ok(None)` for blank input so callers can tell "absent" from
    /// "invalid".
    pub fn parse_input(field: &str, raw: &str) -> Result<Option<Quantity>, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        Decimal::from_str(trimmed)
            .map(|value| Some(Quantity(value.normalize())))
            .map_err(|_| ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: format!("'{}' is not a number", trimmed),
            })
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount with exactly 2 decimal places.
///
/// ## Note
/// This is the plain numeric form used on documents and in the ledger;
/// currency symbols are a rendering concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut value = self.round_currency().0;
        value.rescale(CURRENCY_DECIMALS);
        f.pad(&value.to_string())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0.normalize().to_string())
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money)
    }
}

impl FromStr for Quantity {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Quantity)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
