use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Year-to-date payroll state as of the end of the previous pay period.
///
/// The accumulated figures cover the calendar year up to, but not including,
/// the period being computed. `reliefs_claimed_ytd` holds reliefs already
/// claimed in earlier periods; `claimed_reliefs` holds claims made in the
/// current one. Both are summed per category before caps apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayrollInputs {
    pub accumulated_gross_ytd: Decimal,
    pub accumulated_epf_ytd: Decimal,
    /// PCB already withheld this year.
    pub accumulated_pcb_ytd: Decimal,
    pub accumulated_zakat_ytd: Decimal,
    pub current_month_zakat: Decimal,
    pub child_count: u32,
    pub claims_spouse_rebate: bool,
    pub is_resident: bool,
    pub reliefs_claimed_ytd: BTreeMap<String, Decimal>,
    pub claimed_reliefs: BTreeMap<String, Decimal>,
}

impl Default for PayrollInputs {
    fn default() -> Self {
        Self {
            accumulated_gross_ytd: Decimal::ZERO,
            accumulated_epf_ytd: Decimal::ZERO,
            accumulated_pcb_ytd: Decimal::ZERO,
            accumulated_zakat_ytd: Decimal::ZERO,
            current_month_zakat: Decimal::ZERO,
            child_count: 0,
            claims_spouse_rebate: false,
            is_resident: true,
            reliefs_claimed_ytd: BTreeMap::new(),
            claimed_reliefs: BTreeMap::new(),
        }
    }
}

impl PayrollInputs {
    /// Adds a claim for the current period.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use payroll_core::PayrollInputs;
    ///
    /// let inputs = PayrollInputs::default()
    ///     .with_claim("individual", dec!(9000))
    ///     .with_claim("socso_eis", dec!(41.65));
    ///
    /// assert_eq!(inputs.total_claims()["socso_eis"], dec!(41.65));
    /// ```
    pub fn with_claim(mut self, category: &str, amount: Decimal) -> Self {
        *self
            .claimed_reliefs
            .entry(category.to_string())
            .or_insert(Decimal::ZERO) += amount;
        self
    }

    /// Claims made earlier in the year plus claims made this period, per
    /// category.
    pub fn total_claims(&self) -> BTreeMap<String, Decimal> {
        let mut totals = self.reliefs_claimed_ytd.clone();
        for (category, amount) in &self.claimed_reliefs {
            *totals.entry(category.clone()).or_insert(Decimal::ZERO) += *amount;
        }
        totals
    }

    /// Monetary fields paired with their names, for input validation.
    pub fn amounts(&self) -> [(&'static str, Decimal); 5] {
        [
            ("accumulated_gross_ytd", self.accumulated_gross_ytd),
            ("accumulated_epf_ytd", self.accumulated_epf_ytd),
            ("accumulated_pcb_ytd", self.accumulated_pcb_ytd),
            ("accumulated_zakat_ytd", self.accumulated_zakat_ytd),
            ("current_month_zakat", self.current_month_zakat),
        ]
    }

    /// State for the next pay period once this one has been paid.
    ///
    /// The period's actuals are folded into the running totals, this
    /// period's claims move into `reliefs_claimed_ytd`, and the per-period
    /// zakat resets.
    pub fn advance(&self, gross_paid: Decimal, epf_paid: Decimal, pcb_withheld: Decimal) -> Self {
        Self {
            accumulated_gross_ytd: self.accumulated_gross_ytd + gross_paid,
            accumulated_epf_ytd: self.accumulated_epf_ytd + epf_paid,
            accumulated_pcb_ytd: self.accumulated_pcb_ytd + pcb_withheld,
            accumulated_zakat_ytd: self.accumulated_zakat_ytd + self.current_month_zakat,
            current_month_zakat: Decimal::ZERO,
            reliefs_claimed_ytd: self.total_claims(),
            claimed_reliefs: BTreeMap::new(),
            ..self.clone()
        }
    }
}
