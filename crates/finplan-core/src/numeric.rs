//! Shared numeric and formatting helpers.
//!
//! Every ratio in the engine goes through [`safe_divide`], so a zero revenue
//! or cost base yields `0` rather than an error or an undefined value.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::FinPlanError;
use crate::types::{Money, Rate};
use crate::FinPlanResult;

/// Divide, returning zero when the denominator is zero.
pub fn safe_divide(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// Multiply, reporting an overflow against `field` instead of panicking.
pub fn checked_product(field: &str, a: Decimal, b: Decimal) -> FinPlanResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| {
        FinPlanError::invalid(field, format!("{a} x {b} exceeds the supported decimal range"))
    })
}

/// `true` when `|a - b| <= tolerance`.
pub fn within_tolerance(a: Money, b: Money, tolerance: Money) -> bool {
    (a - b).abs() <= tolerance
}

/// Floor at zero.
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Round a unit count up to the next whole unit.
pub fn ceil_units(units: Decimal) -> Decimal {
    units.ceil()
}

/// Format a monetary amount with thousands separators and no decimals,
/// e.g. `-$1,250,000`.
pub fn format_money(value: Money) -> String {
    let rounded = value.round_dp(0);
    let negative = rounded < Decimal::ZERO;
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Format a decimal rate as a percentage with one decimal, e.g. `0.355` -> `35.5%`.
pub fn format_pct(rate: Rate) -> String {
    format!("{:.1}%", (rate * dec!(100)).round_dp(1))
}

/// Format a day count with one decimal.
pub fn format_days(days: Decimal) -> String {
    format!("{:.1} days", days.round_dp(1))
}
