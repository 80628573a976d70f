//! Rounding and clamping helpers shared by the PCB calculations.
//!
//! Annual intermediates are kept to the sen with half-up rounding. The
//! amount actually withheld from a payslip is rounded up to the next 5 sen,
//! which is how LHDN publishes its monthly deduction figures.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

const FIVE_SEN: Decimal = dec!(0.05);

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly half a sen are rounded away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use payroll_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(16069.795)), dec!(16069.80));
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Truncates a value to whole sen.
///
/// Used where rounding up would hand out more relief than is available.
pub fn round_down_to_sen(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Rounds a value up to the next multiple of 5 sen.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use payroll_core::calculations::common::round_up_to_five_sen;
///
/// assert_eq!(round_up_to_five_sen(dec!(2678.30)), dec!(2678.30));
/// assert_eq!(round_up_to_five_sen(dec!(2678.31)), dec!(2678.35));
/// assert_eq!(round_up_to_five_sen(dec!(0.001)), dec!(0.05));
/// ```
pub fn round_up_to_five_sen(value: Decimal) -> Decimal {
    let steps = (value / FIVE_SEN).ceil();
    (steps * FIVE_SEN).round_dp(2)
}

/// Floors a value at zero.
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}
