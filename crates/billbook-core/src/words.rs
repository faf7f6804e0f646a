//! # Amount in Words
//!
//! Spells the invoice total for the printed document.
//!
//! ```text
//!   1180.00  ──► round to whole units (half to even) ──► 1180
//!            ──► "One Thousand, One Hundred And Eighty Only"
//! ```
//!
//! Groups are joined with commas; a trailing part below one hundred is joined
//! with "And" instead. Every word is capitalised, hyphenated tens included.

use rust_decimal::prelude::ToPrimitive;

use crate::money::Money;

const ONES: [&str; 20] = [
    "Zero", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten",
    "Eleven", "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen",
    "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

/// Short-scale group names, index = power of one thousand.
/// Thirteen groups cover `u128::MAX`.
const SCALES: [&str; 13] = [
    "",
    "Thousand",
    "Million",
    "Billion",
    "Trillion",
    "Quadrillion",
    "Quintillion",
    "Sextillion",
    "Septillion",
    "Octillion",
    "Nonillion",
    "Decillion",
    "Undecillion",
];

/// Spells a value below one hundred.
fn below_hundred(n: u32) -> String {
    match n {
        0..=19 => ONES[n as usize].to_string(),
        _ if n % 10 == 0 => TENS[(n / 10) as usize].to_string(),
        _ => format!("{}-{}", TENS[(n / 10) as usize], ONES[(n % 10) as usize]),
    }
}

/// Spells a value below one thousand (never zero).
fn below_thousand(n: u32) -> String {
    let hundreds = n / 100;
    let rest = n % 100;

    match (hundreds, rest) {
        (0, _) => below_hundred(rest),
        (h, 0) => format!("{} Hundred", ONES[h as usize]),
        (h, r) => format!("{} Hundred And {}", ONES[h as usize], below_hundred(r)),
    }
}

/// Spells a whole number in English short-scale words.
pub fn number_in_words(n: u128) -> String {
    if n == 0 {
        return ONES[0].to_string();
    }

    // (group value, scale index), most significant first
    let mut groups = Vec::new();
    let mut rest = n;
    let mut scale = 0;
    while rest > 0 {
        let group = (rest % 1000) as u32;
        if group > 0 {
            groups.push((group, scale));
        }
        rest /= 1000;
        scale += 1;
    }
    groups.reverse();

    let mut out = String::new();
    let last = groups.len() - 1;
    for (i, (group, scale)) in groups.iter().enumerate() {
        if i > 0 {
            if i == last && *scale == 0 && *group < 100 {
                out.push_str(" And ");
            } else {
                out.push_str(", ");
            }
        }
        out.push_str(&below_thousand(*group));
        if *scale > 0 {
            out.push(' ');
            out.push_str(SCALES[*scale]);
        }
    }
    out
}

/// Spells an invoice total, rounded to whole units, followed by "Only".
///
/// ## Example
/// ```rust
/// use billbook_core::money::Money;
/// use billbook_core::words::amount_in_words;
///
/// assert_eq!(
///     amount_in_words(Money::from_major(1180)),
///     "One Thousand, One Hundred And Eighty Only"
/// );
/// ```
pub fn amount_in_words(total: Money) -> String {
    let whole = total.round_whole();
    let magnitude = whole.abs().to_u128().unwrap_or(0);
    let words = number_in_words(magnitude);

    if whole.is_sign_negative() && magnitude > 0 {
        format!("Minus {} Only", words)
    } else {
        format!("{} Only", words)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
