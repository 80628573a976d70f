//! Relief capping, chargeable income and rebate.
//!
//! Claims are first clamped to their own category cap. Combined-cap rules are
//! then applied in declaration order: within a rule, members are visited in
//! priority order and each keeps as much of its amount as still fits under
//! the joint ceiling.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use rust_decimal_macros::dec;
//! use payroll_core::ReliefPolicy;
//! use payroll_core::calculations::reliefs::apply_relief_caps;
//!
//! let policy = ReliefPolicy::lhdn_2025();
//! let claims = BTreeMap::from([
//!     ("voluntary_epf".to_string(), dec!(4000)),
//!     ("life_insurance".to_string(), dec!(3500)),
//!     ("lifestyle_reading".to_string(), dec!(2000)),
//!     ("lifestyle_devices".to_string(), dec!(2000)),
//! ]);
//!
//! let applied = apply_relief_caps(&policy, &claims).unwrap();
//!
//! // life insurance is clamped to its own 3,000 cap
//! assert_eq!(applied.per_category["life_insurance"], dec!(3000));
//! // the lifestyle group shares 2,500; reading keeps its claim, devices absorb the cut
//! assert_eq!(applied.per_category["lifestyle_reading"], dec!(2000));
//! assert_eq!(applied.per_category["lifestyle_devices"], dec!(500));
//! assert_eq!(applied.total, dec!(9500));
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;

use crate::calculations::common::{non_negative, round_half_up};
use crate::models::{RebatePolicy, ReliefPolicy, ReliefPolicyError};

/// Claims after category caps and combined-cap rules.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppliedReliefs {
    pub per_category: BTreeMap<String, Decimal>,

    /// Amount each combined-cap rule removed, keyed by rule name.
    pub rule_reductions: BTreeMap<String, Decimal>,

    pub total: Decimal,
}

/// Every relief component behind a chargeable-income figure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReliefOutcome {
    pub claims: AppliedReliefs,
    pub child_relief: Decimal,
    pub epf_relief: Decimal,
    pub total_reliefs: Decimal,
    pub chargeable_income: Decimal,
}

/// Clamps `claimed` against the policy's caps and combined-cap rules.
///
/// # Errors
///
/// Returns [`ReliefPolicyError::UnknownCategory`] for a claim the policy does
/// not define and [`ReliefPolicyError::NegativeClaim`] for a negative amount.
pub fn apply_relief_caps(
    policy: &ReliefPolicy,
    claimed: &BTreeMap<String, Decimal>,
) -> Result<AppliedReliefs, ReliefPolicyError> {
    let mut per_category = BTreeMap::new();

    for (category, &amount) in claimed {
        if amount < Decimal::ZERO {
            return Err(ReliefPolicyError::NegativeClaim {
                category: category.clone(),
                amount,
            });
        }
        let cap = policy
            .cap(category)
            .ok_or_else(|| ReliefPolicyError::UnknownCategory(category.clone()))?;

        if amount > cap {
            debug!(category = %category, claimed = %amount, cap = %cap, "claim clamped to category cap");
        }
        per_category.insert(category.clone(), amount.min(cap));
    }

    let mut rule_reductions = BTreeMap::new();
    for rule in &policy.combined_caps {
        let mut room = rule.ceiling;
        let mut reduction = Decimal::ZERO;

        for member in &rule.members {
            if let Some(value) = per_category.get_mut(member) {
                let kept = (*value).min(room);
                reduction += *value - kept;
                room -= kept;
                *value = kept;
            }
        }

        if reduction > Decimal::ZERO {
            debug!(rule = %rule.name, reduction = %reduction, "combined cap reduced claims");
            rule_reductions.insert(rule.name.clone(), reduction);
        }
    }

    let total = per_category.values().copied().sum();
    Ok(AppliedReliefs {
        per_category,
        rule_reductions,
        total,
    })
}

/// Computes chargeable income from annual gross, claims and EPF.
///
/// EPF counts up to the policy's `epf_relief_cap` regardless of how much was
/// actually contributed. Child relief is `child_count` times the per-child
/// amount.
pub fn apply_reliefs(
    policy: &ReliefPolicy,
    gross_annual: Decimal,
    claimed: &BTreeMap<String, Decimal>,
    epf_annual_contribution: Decimal,
    child_count: u32,
) -> Result<ReliefOutcome, ReliefPolicyError> {
    let claims = apply_relief_caps(policy, claimed)?;
    let child_relief = policy.child_relief_per_child * Decimal::from(child_count);
    let epf_relief = non_negative(epf_annual_contribution).min(policy.epf_relief_cap);

    let total_reliefs = claims.total + child_relief + epf_relief;
    let chargeable_income = round_half_up(non_negative(gross_annual - total_reliefs));

    Ok(ReliefOutcome {
        claims,
        child_relief,
        epf_relief,
        total_reliefs,
        chargeable_income,
    })
}

/// Rebate due for `chargeable_income`; zero above the threshold.
pub fn rebate_for(
    rebate: &RebatePolicy,
    chargeable_income: Decimal,
    claims_spouse_rebate: bool,
) -> Decimal {
    if chargeable_income > rebate.threshold {
        return Decimal::ZERO;
    }
    if claims_spouse_rebate {
        rebate.individual + rebate.spouse
    } else {
        rebate.individual
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;

    fn claims(items: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
        items
            .iter()
            .map(|(name, amount)| (name.to_string(), *amount))
            .collect()
    }

    // =========================================================================
    // apply_relief_caps tests
    // =========================================================================

    #[test]
    fn clamps_each_claim_to_its_cap() {
        let policy = ReliefPolicy::lhdn_2025();

        let applied =
            apply_relief_caps(&policy, &claims(&[("socso_eis", dec!(500)), ("prs", dec!(1000))]))
                .unwrap();

        assert_eq!(applied.per_category["socso_eis"], dec!(350));
        assert_eq!(applied.per_category["prs"], dec!(1000));
        assert_eq!(applied.total, dec!(1350));
    }

    #[test]
    fn combined_cap_reduces_later_members_first() {
        let policy = ReliefPolicy::lhdn_2025();

        let applied = apply_relief_caps(
            &policy,
            &claims(&[
                ("serious_disease_medical", dec!(9500)),
                ("vaccination", dec!(800)),
                ("dental", dec!(600)),
            ]),
        )
        .unwrap();

        assert_eq!(applied.per_category["serious_disease_medical"], dec!(9500));
        assert_eq!(applied.per_category["vaccination"], dec!(500));
        assert_eq!(applied.per_category["dental"], dec!(0));
        assert_eq!(applied.rule_reductions["medical"], dec!(900));
        assert_eq!(applied.total, dec!(10000));
    }

    #[test]
    fn claims_within_ceiling_are_untouched() {
        let policy = ReliefPolicy::lhdn_2025();

        let applied = apply_relief_caps(
            &policy,
            &claims(&[("sports_equipment", dec!(400)), ("sports_facility", dec!(300))]),
        )
        .unwrap();

        assert_eq!(applied.total, dec!(700));
        assert!(applied.rule_reductions.is_empty());
    }

    #[test]
    fn rejects_unknown_category() {
        let policy = ReliefPolicy::lhdn_2025();

        let result = apply_relief_caps(&policy, &claims(&[("yacht", dec!(100))]));

        assert_eq!(
            result,
            Err(ReliefPolicyError::UnknownCategory("yacht".to_string()))
        );
    }

    #[test]
    fn rejects_negative_claim() {
        let policy = ReliefPolicy::lhdn_2025();

        let result = apply_relief_caps(&policy, &claims(&[("dental", dec!(-10))]));

        assert_eq!(
            result,
            Err(ReliefPolicyError::NegativeClaim {
                category: "dental".to_string(),
                amount: dec!(-10),
            })
        );
    }

    // =========================================================================
    // apply_reliefs tests
    // =========================================================================

    #[test]
    fn epf_relief_is_capped_independently() {
        let policy = ReliefPolicy::lhdn_2025();

        let outcome = apply_reliefs(
            &policy,
            dec!(120000),
            &claims(&[("individual", dec!(9000))]),
            dec!(13200),
            0,
        )
        .unwrap();

        assert_eq!(outcome.epf_relief, dec!(4000));
        assert_eq!(outcome.chargeable_income, dec!(107000));
    }

    #[test]
    fn child_relief_scales_with_child_count() {
        let policy = ReliefPolicy::lhdn_2025();

        let outcome = apply_reliefs(&policy, dec!(60000), &BTreeMap::new(), dec!(0), 3).unwrap();

        assert_eq!(outcome.child_relief, dec!(6000));
        assert_eq!(outcome.chargeable_income, dec!(54000));
    }

    #[test]
    fn chargeable_income_floors_at_zero() {
        let policy = ReliefPolicy::lhdn_2025();

        let outcome = apply_reliefs(
            &policy,
            dec!(8000),
            &claims(&[("individual", dec!(9000))]),
            dec!(880),
            0,
        )
        .unwrap();

        assert_eq!(outcome.chargeable_income, Decimal::ZERO);
    }

    // =========================================================================
    // rebate_for tests
    // =========================================================================

    #[test]
    fn rebate_applies_at_threshold() {
        let rebate = RebatePolicy::lhdn_2025();

        assert_eq!(rebate_for(&rebate, dec!(35000), false), dec!(400));
        assert_eq!(rebate_for(&rebate, dec!(35000), true), dec!(800));
    }

    #[test]
    fn no_rebate_above_threshold() {
        let rebate = RebatePolicy::lhdn_2025();

        assert_eq!(rebate_for(&rebate, dec!(35000.01), true), Decimal::ZERO);
    }

    // =========================================================================
    // properties
    // =========================================================================

    fn claim_strategy() -> impl Strategy<Value = BTreeMap<String, Decimal>> {
        let categories: Vec<String> = ReliefPolicy::lhdn_2025().caps.into_keys().collect();
        prop::collection::btree_map(
            prop::sample::select(categories),
            (0i64..2_000_000).prop_map(|sen| Decimal::new(sen, 2)),
            0..20,
        )
    }

    proptest! {
        #[test]
        fn caps_hold_for_any_claims(claimed in claim_strategy()) {
            let policy = ReliefPolicy::lhdn_2025();

            let applied = apply_relief_caps(&policy, &claimed).unwrap();

            for (category, amount) in &applied.per_category {
                prop_assert!(*amount >= Decimal::ZERO);
                prop_assert!(*amount <= policy.caps[category]);
            }
            for rule in &policy.combined_caps {
                let sum: Decimal = rule
                    .members
                    .iter()
                    .filter_map(|m| applied.per_category.get(m))
                    .copied()
                    .sum();
                prop_assert!(sum <= rule.ceiling, "rule {} sums to {}", rule.name, sum);
            }
        }
    }
}
