//! Parallel payroll runs.
//!
//! Every employee's computation is independent and side-effect free, so a run
//! is a plain parallel map over the requests.

use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::calculations::pcb::{PcbBreakdown, PcbCalculator, PcbError};
use crate::models::{PayPeriod, PayrollInputs};

/// One employee's entry in a payroll run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayrollRequest {
    pub employee_id: String,
    pub inputs: PayrollInputs,
    pub current_gross: Decimal,
    pub current_epf: Decimal,
    pub period: PayPeriod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayrollOutcome {
    pub employee_id: String,
    pub result: Result<PcbBreakdown, PcbError>,
}

/// Computes PCB for every request in parallel.
///
/// Returns one outcome per request, in request order. A failing employee
/// does not stop the run.
pub fn compute_batch(
    calculator: &PcbCalculator<'_>,
    requests: &[PayrollRequest],
) -> Vec<PayrollOutcome> {
    let outcomes: Vec<PayrollOutcome> = requests
        .par_iter()
        .map(|request| PayrollOutcome {
            employee_id: request.employee_id.clone(),
            result: calculator.calculate(
                &request.inputs,
                request.current_gross,
                request.current_epf,
                request.period,
            ),
        })
        .collect();

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        warn!(failed, total = outcomes.len(), "payroll run finished with failures");
    } else {
        info!(total = outcomes.len(), "payroll run finished");
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{ReliefPolicy, TaxBracketTable};

    fn request(id: &str, gross: Decimal) -> PayrollRequest {
        PayrollRequest {
            employee_id: id.to_string(),
            inputs: PayrollInputs::default().with_claim("individual", dec!(9000)),
            current_gross: gross,
            current_epf: round_epf(gross),
            period: PayPeriod::new(6, 2025).unwrap(),
        }
    }

    fn round_epf(gross: Decimal) -> Decimal {
        (gross * dec!(0.11)).round_dp(2)
    }

    #[test]
    fn preserves_request_order_and_matches_single_runs() {
        let brackets = TaxBracketTable::lhdn_2025();
        let policy = ReliefPolicy::lhdn_2025();
        let calculator = PcbCalculator::new(&brackets, &policy).unwrap();
        let requests: Vec<_> = (1..=50)
            .map(|i| request(&format!("E{i:03}"), Decimal::from(i * 500)))
            .collect();

        let outcomes = compute_batch(&calculator, &requests);

        assert_eq!(outcomes.len(), requests.len());
        for (outcome, request) in outcomes.iter().zip(&requests) {
            assert_eq!(outcome.employee_id, request.employee_id);
            let single = calculator.calculate(
                &request.inputs,
                request.current_gross,
                request.current_epf,
                request.period,
            );
            assert_eq!(outcome.result, single);
        }
    }

    #[test]
    fn failure_is_reported_per_employee() {
        let brackets = TaxBracketTable::lhdn_2025();
        let policy = ReliefPolicy::lhdn_2025();
        let calculator = PcbCalculator::new(&brackets, &policy).unwrap();
        let requests = vec![request("E001", dec!(5000)), request("E002", dec!(-1))];

        let outcomes = compute_batch(&calculator, &requests);

        assert!(outcomes[0].result.is_ok());
        assert_eq!(
            outcomes[1].result,
            Err(PcbError::NegativeAmount {
                field: "current_gross",
                amount: dec!(-1)
            })
        );
    }

    #[test]
    fn failed_outcomes_can_be_kept_for_a_retry_run() {
        let brackets = TaxBracketTable::lhdn_2025();
        let policy = ReliefPolicy::lhdn_2025();
        let calculator = PcbCalculator::new(&brackets, &policy).unwrap();
        let requests = vec![request("E001", dec!(5000)), request("E002", dec!(-1))];
        let outcomes = compute_batch(&calculator, &requests);

        let failed: Vec<PayrollOutcome> =
            outcomes.iter().filter(|o| o.result.is_err()).cloned().collect();

        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0], outcomes[1]);
    }
}
