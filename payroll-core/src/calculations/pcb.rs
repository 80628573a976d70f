//! PCB (monthly tax deduction) computation.
//!
//! Implements LHDN's annualisation method. The current month's gross and EPF
//! are assumed to repeat for every remaining month of the year, the projected
//! annual chargeable income is taxed through the bracket table, and the
//! annual liability is spread across the months left in the year including
//! the current one.
//!
//! # Computation Steps
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | `n` = months remaining after the current one |
//! | 2    | EPF relief: accumulated, current, then `n` future months against the annual cap |
//! | 3    | Projected gross: accumulated + current + current × `n` |
//! | 4    | Chargeable income `P` = projected gross − EPF relief − other reliefs, floored at 0 |
//! | 5    | Annual tax from the bracket table, less the rebate when `P` is under the threshold |
//! | 6    | Monthly PCB: annual tax ÷ (`n` + 1) |
//! | 7    | Withholding: (annual tax − zakat paid − PCB withheld) ÷ (`n` + 1) − current zakat, rounded up to 5 sen |
//!
//! Non-resident employees skip all of this and pay a flat rate on the
//! current month's gross.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use payroll_core::{PayPeriod, PayrollInputs, PcbCalculator, TaxConfig};
//!
//! let config = TaxConfig::lhdn_2025();
//! let calculator = PcbCalculator::from_config(&config).unwrap();
//!
//! let inputs = PayrollInputs {
//!     accumulated_gross_ytd: dec!(170000),
//!     accumulated_epf_ytd: dec!(1870),
//!     ..PayrollInputs::default()
//! }
//! .with_claim("individual", dec!(9000))
//! .with_claim("socso_eis", dec!(41.65));
//!
//! let period = PayPeriod::new(11, 2025).unwrap();
//! let result = calculator.calculate(&inputs, dec!(17000), dec!(1870), period).unwrap();
//!
//! assert_eq!(result.chargeable_income, dec!(190958.35));
//! assert_eq!(result.annual_tax_after_rebate, dec!(32139.59));
//! assert_eq!(result.monthly_preview, dec!(2678.30));
//! assert_eq!(result.monthly_pcb, dec!(16069.80));
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::calculations::common::{non_negative, round_half_up, round_up_to_five_sen};
use crate::calculations::epf::{EpfReliefAllocation, allocate_epf_relief};
use crate::calculations::reliefs::{apply_reliefs, rebate_for};
use crate::error::{ErrorKind, PayrollError};
use crate::models::{
    PayPeriod, PayrollInputs, ReliefPolicy, ReliefPolicyError, TaxBracketTable, TaxConfig,
    check_non_resident_rate,
};

/// Flat rate for non-residents when no configuration overrides it.
pub const DEFAULT_NON_RESIDENT_RATE: Decimal = dec!(0.30);

const MONTHS_IN_YEAR: Decimal = dec!(12);

/// Errors that can occur while computing PCB.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PcbError {
    /// Monetary inputs are rejected rather than clamped, so upstream
    /// data-entry mistakes surface.
    #[error("{field} must not be negative, got {amount}")]
    NegativeAmount { field: &'static str, amount: Decimal },

    #[error(transparent)]
    Reliefs(#[from] ReliefPolicyError),
}

impl PcbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NegativeAmount { .. } => ErrorKind::InvalidInput,
            Self::Reliefs(e) => e.kind(),
        }
    }
}

/// Full result of a PCB computation.
///
/// Both monthly views are kept: `monthly_pcb` is the official figure using
/// the `n + 1` divisor, `monthly_preview` is the annual tax over 12 shown on
/// some screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PcbBreakdown {
    pub period: PayPeriod,
    pub is_resident: bool,

    /// Months remaining after the current one (`n`).
    pub remaining_months: u32,

    /// Accumulated + current + projected future gross.
    pub projected_gross: Decimal,

    pub epf_relief: EpfReliefAllocation,

    /// Claims after caps and combined-cap rules, per category.
    pub reliefs: BTreeMap<String, Decimal>,

    pub child_relief: Decimal,
    pub total_reliefs: Decimal,
    pub chargeable_income: Decimal,
    pub annual_tax_before_rebate: Decimal,
    pub rebate: Decimal,
    pub annual_tax_after_rebate: Decimal,

    /// Annual tax ÷ (`n` + 1).
    pub monthly_pcb: Decimal,

    /// Annual tax ÷ 12.
    pub monthly_preview: Decimal,

    /// Amount to deduct this month after crediting PCB already withheld and
    /// zakat, rounded up to 5 sen.
    pub withholding: Decimal,

    /// Annual tax not yet covered by PCB withheld or zakat paid.
    pub remaining_liability: Decimal,
}

/// Calculator bound to one bracket table and relief policy.
///
/// Holds only shared references, so a single calculator can serve many
/// employees concurrently.
#[derive(Debug, Clone, Copy)]
pub struct PcbCalculator<'a> {
    brackets: &'a TaxBracketTable,
    policy: &'a ReliefPolicy,
    non_resident_rate: Decimal,
    tax_year: Option<i32>,
}

impl<'a> PcbCalculator<'a> {
    /// Builds a calculator over `brackets` and `policy`.
    ///
    /// The bracket table is validated when it is built; the policy is
    /// validated here.
    ///
    /// # Errors
    ///
    /// Returns [`PayrollError::ReliefPolicy`] if the policy is inconsistent.
    pub fn new(brackets: &'a TaxBracketTable, policy: &'a ReliefPolicy) -> Result<Self, PayrollError> {
        policy.validate()?;
        Ok(Self {
            brackets,
            policy,
            non_resident_rate: DEFAULT_NON_RESIDENT_RATE,
            tax_year: None,
        })
    }

    /// Replaces the flat non-resident rate.
    ///
    /// # Errors
    ///
    /// Returns [`PayrollError::TaxConfig`] when `rate` is outside `0..=1`.
    pub fn with_non_resident_rate(mut self, rate: Decimal) -> Result<Self, PayrollError> {
        check_non_resident_rate(rate)?;
        self.non_resident_rate = rate;
        Ok(self)
    }

    /// Builds a calculator from a validated configuration snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PayrollError`] if the snapshot fails validation.
    pub fn from_config(config: &'a TaxConfig) -> Result<Self, PayrollError> {
        config.validate()?;
        Ok(Self {
            brackets: &config.brackets,
            policy: &config.policy,
            non_resident_rate: config.non_resident_rate,
            tax_year: Some(config.tax_year),
        })
    }

    /// Computes the PCB breakdown for one employee and pay period.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Year-to-date state as of the end of the previous period
    /// * `current_gross` - Gross pay for the current period
    /// * `current_epf` - Employee EPF contribution for the current period
    /// * `period` - The pay period being computed
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::NegativeAmount`] for any negative monetary input,
    /// or [`PcbError::Reliefs`] when a claim is negative or names a category
    /// the policy does not define.
    pub fn calculate(
        &self,
        inputs: &PayrollInputs,
        current_gross: Decimal,
        current_epf: Decimal,
        period: PayPeriod,
    ) -> Result<PcbBreakdown, PcbError> {
        check_non_negative("current_gross", current_gross)?;
        check_non_negative("current_epf", current_epf)?;
        for (field, amount) in inputs.amounts() {
            check_non_negative(field, amount)?;
        }

        if let Some(tax_year) = self.tax_year {
            if tax_year != period.year() {
                warn!(period = %period, tax_year, "pay period falls outside the configured tax year");
            }
        }

        let breakdown = if inputs.is_resident {
            self.resident(inputs, current_gross, current_epf, period)?
        } else {
            self.non_resident(inputs, current_gross, period)
        };

        debug!(
            period = %period,
            chargeable_income = %breakdown.chargeable_income,
            annual_tax = %breakdown.annual_tax_after_rebate,
            monthly_pcb = %breakdown.monthly_pcb,
            withholding = %breakdown.withholding,
            "computed PCB"
        );
        Ok(breakdown)
    }

    fn resident(
        &self,
        inputs: &PayrollInputs,
        current_gross: Decimal,
        current_epf: Decimal,
        period: PayPeriod,
    ) -> Result<PcbBreakdown, PcbError> {
        let n = period.remaining_months();
        let divisor = Decimal::from(period.divisor());

        let epf_relief = allocate_epf_relief(
            self.policy.epf_relief_cap,
            inputs.accumulated_epf_ytd,
            current_epf,
            n,
        );

        let projected_gross =
            inputs.accumulated_gross_ytd + current_gross + current_gross * Decimal::from(n);

        let relief = apply_reliefs(
            self.policy,
            projected_gross,
            &inputs.total_claims(),
            epf_relief.total,
            inputs.child_count,
        )?;
        let chargeable_income = relief.chargeable_income;

        let annual_tax_before_rebate = self.brackets.tax_before_rebate(chargeable_income);
        let rebate = rebate_for(
            &self.policy.rebate,
            chargeable_income,
            inputs.claims_spouse_rebate,
        )
        .min(annual_tax_before_rebate);
        let annual_tax_after_rebate = non_negative(annual_tax_before_rebate - rebate);

        let credited = inputs.accumulated_pcb_ytd + inputs.accumulated_zakat_ytd;
        let withholding = round_up_to_five_sen(non_negative(
            (annual_tax_after_rebate - credited) / divisor - inputs.current_month_zakat,
        ));

        Ok(PcbBreakdown {
            period,
            is_resident: true,
            remaining_months: n,
            projected_gross,
            epf_relief,
            reliefs: relief.claims.per_category,
            child_relief: relief.child_relief,
            total_reliefs: relief.total_reliefs,
            chargeable_income,
            annual_tax_before_rebate,
            rebate,
            annual_tax_after_rebate,
            monthly_pcb: round_half_up(annual_tax_after_rebate / divisor),
            monthly_preview: round_half_up(annual_tax_after_rebate / MONTHS_IN_YEAR),
            withholding,
            remaining_liability: non_negative(annual_tax_after_rebate - credited),
        })
    }

    fn non_resident(
        &self,
        inputs: &PayrollInputs,
        current_gross: Decimal,
        period: PayPeriod,
    ) -> PcbBreakdown {
        let annual_gross = current_gross * MONTHS_IN_YEAR;
        let annual_tax = round_half_up(annual_gross * self.non_resident_rate);
        let monthly = round_half_up(current_gross * self.non_resident_rate);
        let credited = inputs.accumulated_pcb_ytd + inputs.accumulated_zakat_ytd;

        PcbBreakdown {
            period,
            is_resident: false,
            remaining_months: period.remaining_months(),
            projected_gross: annual_gross,
            epf_relief: EpfReliefAllocation::default(),
            reliefs: BTreeMap::new(),
            child_relief: Decimal::ZERO,
            total_reliefs: Decimal::ZERO,
            chargeable_income: annual_gross,
            annual_tax_before_rebate: annual_tax,
            rebate: Decimal::ZERO,
            annual_tax_after_rebate: annual_tax,
            monthly_pcb: monthly,
            monthly_preview: monthly,
            withholding: round_up_to_five_sen(monthly),
            remaining_liability: non_negative(annual_tax - credited),
        }
    }
}

/// Computes the official monthly PCB (annual tax ÷ (`n` + 1)).
///
/// Convenience wrapper over [`PcbCalculator::calculate`] for callers that
/// only need the deduction figure.
///
/// # Errors
///
/// Rejects an inconsistent `policy` before computing, then fails like
/// [`PcbCalculator::calculate`].
pub fn compute_monthly_pcb(
    inputs: &PayrollInputs,
    current_gross: Decimal,
    current_epf: Decimal,
    policy: &ReliefPolicy,
    brackets: &TaxBracketTable,
    period: PayPeriod,
) -> Result<Decimal, PayrollError> {
    let breakdown =
        PcbCalculator::new(brackets, policy)?.calculate(inputs, current_gross, current_epf, period)?;
    Ok(breakdown.monthly_pcb)
}

fn check_non_negative(field: &'static str, amount: Decimal) -> Result<(), PcbError> {
    if amount < Decimal::ZERO {
        return Err(PcbError::NegativeAmount { field, amount });
    }
    Ok(())
}
