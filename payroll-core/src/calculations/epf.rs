//! EPF relief allocation across the year.
//!
//! The annual EPF relief cap is consumed left to right: contributions already
//! made this year first, then the current month, then the projected future
//! months. Each term only gets what is left of the cap, so contributions past
//! the cap simply earn no relief.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::common::round_down_to_sen;

/// EPF relief split by where in the year it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EpfReliefAllocation {
    pub accumulated: Decimal,
    pub current: Decimal,
    /// Relief assumed for each remaining month.
    pub future_per_month: Decimal,
    pub future: Decimal,
    pub total: Decimal,
    /// Cap room left unused after the projection.
    pub unused_cap: Decimal,
}

/// Allocates the EPF relief cap across accumulated, current and future
/// contributions.
///
/// Future months are assumed to repeat `current_epf`, and can never be
/// credited more than that per month.
///
/// # Example
///
/// ```
/// use rust_decimal_macros::dec;
/// use payroll_core::calculations::epf::allocate_epf_relief;
///
/// let epf = allocate_epf_relief(dec!(4000), dec!(1870), dec!(1870), 1);
///
/// assert_eq!(epf.accumulated, dec!(1870));
/// assert_eq!(epf.current, dec!(1870));
/// assert_eq!(epf.future, dec!(260));
/// assert_eq!(epf.total, dec!(4000));
/// ```
pub fn allocate_epf_relief(
    cap: Decimal,
    accumulated_epf: Decimal,
    current_epf: Decimal,
    remaining_months: u32,
) -> EpfReliefAllocation {
    let mut room = cap;

    let accumulated = accumulated_epf.min(room);
    room -= accumulated;

    let current = current_epf.min(room);
    room -= current;

    let future_per_month = if remaining_months > 0 {
        current_epf.min(round_down_to_sen(room / Decimal::from(remaining_months)))
    } else {
        Decimal::ZERO
    };
    let future = future_per_month * Decimal::from(remaining_months);
    room -= future;

    if room.is_zero() && accumulated_epf + current_epf >= cap {
        debug!(cap = %cap, accumulated = %accumulated_epf, "EPF relief cap fully consumed");
    }

    EpfReliefAllocation {
        accumulated,
        current,
        future_per_month,
        future,
        total: accumulated + current + future,
        unused_cap: room,
    }
}
