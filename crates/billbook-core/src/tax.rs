//! # Tax Module
//!
//! Tax rate, tax configuration and the tax split calculator.
//!
//! ## Inclusive Pricing, Split by Origin
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Catalog rates INCLUDE tax. The invoice backs the tax out:              │
//! │                                                                         │
//! │     subtotal 1180.00 ──► taxable base = 1180.00 / 1.18 = 1000.00        │
//! │                          total tax    = 1180.00 - 1000.00 = 180.00      │
//! │                                                                         │
//! │  customer code == supplier code (same origin)                           │
//! │     CGST 90.00 + SGST 90.00, IGST 0.00                                  │
//! │                                                                         │
//! │  customer code != supplier code (cross origin)                          │
//! │     CGST 0.00 + SGST 0.00, IGST 180.00                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::{DEFAULT_SUPPLIER_JURISDICTION, DEFAULT_TAX_RATE_BPS};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18% (standard GST slab)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as an exact decimal fraction (1800 bps → 0.18).
    #[inline]
    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 4)
    }

    /// Returns `1 + rate`, the divisor that backs tax out of a gross amount.
    #[inline]
    pub fn inclusive_factor(&self) -> Decimal {
        Decimal::ONE + self.as_fraction()
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::from_bps(DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Tax Configuration
// =============================================================================

/// Explicit tax configuration handed to the calculator at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxConfig {
    /// Rate applied to every invoice.
    pub rate: TaxRate,

    /// Jurisdiction (state) code of the supplier.
    pub supplier_jurisdiction: String,
}

impl Default for TaxConfig {
    fn default() -> Self {
        TaxConfig {
            rate: TaxRate::default(),
            supplier_jurisdiction: DEFAULT_SUPPLIER_JURISDICTION.to_string(),
        }
    }
}

// =============================================================================
// Tax Split
// =============================================================================

/// Decomposition of a tax-inclusive amount.
///
/// Exactly one of {`same_origin_half` pair, `cross_origin`} is non-zero for
/// a non-zero amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxSplit {
    /// Tax-exclusive value underlying the gross amount.
    pub taxable_base: Money,
    /// Each of the two same-origin components (CGST and SGST).
    pub same_origin_half: Money,
    /// The single cross-origin component (IGST).
    pub cross_origin: Money,
}

impl TaxSplit {
    /// Central component (first half of the same-origin pair).
    #[inline]
    pub fn cgst(&self) -> Money {
        self.same_origin_half
    }

    /// State component (second half of the same-origin pair).
    #[inline]
    pub fn sgst(&self) -> Money {
        self.same_origin_half
    }

    /// Integrated component.
    #[inline]
    pub fn igst(&self) -> Money {
        self.cross_origin
    }

    /// Sum of all tax components.
    #[inline]
    pub fn total_tax(&self) -> Money {
        self.same_origin_half + self.same_origin_half + self.cross_origin
    }

    /// Rounds every component independently to 2 decimal places.
    ///
    /// Nothing is redistributed, so the rounded components may differ from
    /// the rounded grand total by a paisa.
    pub fn rounded(&self) -> TaxSplit {
        TaxSplit {
            taxable_base: self.taxable_base.round_currency(),
            same_origin_half: self.same_origin_half.round_currency(),
            cross_origin: self.cross_origin.round_currency(),
        }
    }
}

// =============================================================================
// Tax Split Calculator
// =============================================================================

/// Pure calculator mapping a gross amount and origin to a [`TaxSplit`].
///
/// ## Example
/// ```rust
/// use billbook_core::money::Money;
/// use billbook_core::tax::{TaxConfig, TaxSplitCalculator};
///
/// let calc = TaxSplitCalculator::new(TaxConfig::default());
/// assert!(calc.is_same_origin("37"));
///
/// let split = calc.split(Money::from_major(1180), false).rounded();
/// assert_eq!(split.cross_origin, Money::from_major(180));
/// assert!(split.same_origin_half.is_zero());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TaxSplitCalculator {
    config: TaxConfig,
}

impl TaxSplitCalculator {
    /// Creates a calculator for the given configuration.
    pub fn new(config: TaxConfig) -> Self {
        TaxSplitCalculator { config }
    }

    /// Returns the configuration this calculator was built with.
    pub fn config(&self) -> &TaxConfig {
        &self.config
    }

    /// Whether a customer jurisdiction matches the supplier's.
    pub fn is_same_origin(&self, customer_jurisdiction: &str) -> bool {
        customer_jurisdiction.trim() == self.config.supplier_jurisdiction.trim()
    }

    /// Splits a tax-inclusive subtotal.
    ///
    /// Total over any subtotal ≥ 0. Components are unrounded; call
    /// [`TaxSplit::rounded`] for presentation values.
    pub fn split(&self, subtotal_inclusive: Money, is_same_origin: bool) -> TaxSplit {
        let taxable_base = subtotal_inclusive.divide_by(self.config.rate.inclusive_factor());
        let total_tax = subtotal_inclusive - taxable_base;

        if is_same_origin {
            TaxSplit {
                taxable_base,
                same_origin_half: total_tax.halve(),
                cross_origin: Money::ZERO,
            }
        } else {
            TaxSplit {
                taxable_base,
                same_origin_half: Money::ZERO,
                cross_origin: total_tax,
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn calculator() -> TaxSplitCalculator {
        TaxSplitCalculator::new(TaxConfig::default())
    }

    #[test]
    fn test_tax_rate_fraction() {
        let rate = TaxRate::from_bps(1800);
        assert_eq!(rate.as_fraction(), dec!(0.18));
        assert_eq!(rate.inclusive_factor(), dec!(1.18));
        assert_eq!(rate.bps(), 1800);
    }

    #[test]
    fn test_same_origin_split_of_1180() {
        let split = calculator().split(Money::from_major(1180), true).rounded();

        assert_eq!(split.taxable_base, Money::from_major(1000));
        assert_eq!(split.cgst(), Money::from_major(90));
        assert_eq!(split.sgst(), Money::from_major(90));
        assert_eq!(split.igst(), Money::ZERO);
    }

    #[test]
    fn test_cross_origin_split_of_1180() {
        let split = calculator().split(Money::from_major(1180), false).rounded();

        assert_eq!(split.taxable_base, Money::from_major(1000));
        assert_eq!(split.cgst(), Money::ZERO);
        assert_eq!(split.sgst(), Money::ZERO);
        assert_eq!(split.igst(), Money::from_major(180));
    }

    #[test]
    fn test_zero_subtotal() {
        let split = calculator().split(Money::ZERO, true);
        assert_eq!(split, TaxSplit::default());
    }

    #[test]
    fn test_origin_comparison_trims() {
        let calc = calculator();
        assert!(calc.is_same_origin("37"));
        assert!(calc.is_same_origin(" 37 "));
        assert!(!calc.is_same_origin("36"));
        assert!(!calc.is_same_origin(""));
    }

    #[test]
    fn test_custom_rate() {
        let calc = TaxSplitCalculator::new(TaxConfig {
            rate: TaxRate::from_bps(500),
            supplier_jurisdiction: "29".to_string(),
        });
        let split = calc.split(Money::from_major(105), calc.is_same_origin("29"));
        assert_eq!(split.taxable_base, Money::from_major(100));
        assert_eq!(split.same_origin_half, Money::new(dec!(2.5)));
    }

    #[test]
    fn test_rounding_is_per_component() {
        // 100.00 / 1.18 = 84.7457..., tax 15.2542..., half 7.6271...
        let split = calculator().split(Money::from_major(100), true).rounded();
        assert_eq!(split.taxable_base, Money::new(dec!(84.75)));
        assert_eq!(split.same_origin_half, Money::new(dec!(7.63)));
        // 84.75 + 7.63 + 7.63 = 100.01: documented drift, not corrected.
        assert_eq!(
            split.taxable_base + split.total_tax(),
            Money::new(dec!(100.01))
        );
    }

    fn subtotal() -> impl Strategy<Value = Money> {
        (0i64..100_000_000).prop_map(Money::from_minor)
    }

    proptest! {
        #[test]
        fn prop_same_origin_halves_equal_and_sum_to_tax(s in subtotal()) {
            let split = calculator().split(s, true);
            let expected_tax = s - s.divide_by(dec!(1.18));

            prop_assert_eq!(split.cgst(), split.sgst());
            prop_assert!(split.cross_origin.is_zero());
            prop_assert!((split.cgst() + split.sgst()).within(expected_tax, Money::new(dec!(0.0000000001))));
        }

        #[test]
        fn prop_cross_origin_carries_whole_tax(s in subtotal()) {
            let split = calculator().split(s, false);
            let expected_tax = s - s.divide_by(dec!(1.18));

            prop_assert!(split.same_origin_half.is_zero());
            prop_assert_eq!(split.igst(), expected_tax);
        }

        #[test]
        fn prop_split_is_idempotent(s in subtotal(), same in any::<bool>()) {
            let calc = calculator();
            prop_assert_eq!(calc.split(s, same), calc.split(s, same));
        }
    }
}
