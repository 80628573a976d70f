//! Relief caps, combined-cap rules and the rebate policy.
//!
//! A [`ReliefPolicy`] maps relief categories (as named on the TP1 form) to an
//! annual cap. Groups of categories that share a joint ceiling are declared as
//! [`CombinedCapRule`]s; members are listed in priority order, so earlier
//! members keep their amount and later members absorb any reduction.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

/// Largest annual cap a single category or rule may carry.
///
/// No statutory relief comes close; a larger figure is almost certainly a
/// data-entry mistake (an extra zero, or a monthly/annual mix-up).
pub const MAX_PLAUSIBLE_CAP: Decimal = dec!(100000);

/// Errors raised by policy validation and relief application.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReliefPolicyError {
    #[error("relief category '{0}' is not defined in the policy")]
    UnknownCategory(String),

    #[error("combined cap '{rule}' references undefined category '{category}'")]
    UnknownRuleMember { rule: String, category: String },

    #[error("claim for '{category}' must not be negative, got {amount}")]
    NegativeClaim { category: String, amount: Decimal },

    #[error("cap for '{category}' must not be negative, got {cap}")]
    NegativeCap { category: String, cap: Decimal },

    #[error("cap for '{category}' of {cap} exceeds the plausible limit of {limit}")]
    ImplausibleCap {
        category: String,
        cap: Decimal,
        limit: Decimal,
    },

    #[error("ceiling of combined cap '{rule}' must not be negative, got {ceiling}")]
    NegativeCeiling { rule: String, ceiling: Decimal },

    #[error("EPF relief cap must not be negative, got {0}")]
    NegativeEpfReliefCap(Decimal),

    #[error("rebate threshold must not be negative, got {0}")]
    NegativeRebateThreshold(Decimal),

    #[error("rebate amount must not be negative, got {0}")]
    NegativeRebate(Decimal),
}

impl ReliefPolicyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCategory(_)
            | Self::UnknownRuleMember { .. }
            | Self::NegativeClaim { .. } => ErrorKind::InvalidInput,
            _ => ErrorKind::ConfigurationInconsistency,
        }
    }
}

/// Rebate granted when chargeable income is at or below `threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebatePolicy {
    pub threshold: Decimal,
    pub individual: Decimal,
    pub spouse: Decimal,
}

impl RebatePolicy {
    pub fn lhdn_2025() -> Self {
        Self {
            threshold: dec!(35000),
            individual: dec!(400),
            spouse: dec!(400),
        }
    }
}

/// A joint ceiling over several categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedCapRule {
    pub name: String,

    /// Member categories, highest priority first.
    pub members: Vec<String>,

    pub ceiling: Decimal,
}

impl CombinedCapRule {
    pub fn new(name: &str, members: &[&str], ceiling: Decimal) -> Self {
        Self {
            name: name.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            ceiling,
        }
    }
}

/// Relief caps and rebate rules for one year of assessment.
///
/// # Example
///
/// ```
/// use rust_decimal_macros::dec;
/// use payroll_core::ReliefPolicy;
///
/// let policy = ReliefPolicy::lhdn_2025();
///
/// assert_eq!(policy.cap("individual"), Some(dec!(9000)));
/// assert_eq!(policy.epf_relief_cap, dec!(4000));
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReliefPolicy {
    /// Annual cap on mandatory EPF contributions counted for PCB.
    pub epf_relief_cap: Decimal,

    /// Relief per qualifying child, multiplied by the declared child count.
    pub child_relief_per_child: Decimal,

    pub rebate: RebatePolicy,

    /// Annual cap per claimable category.
    pub caps: BTreeMap<String, Decimal>,

    /// Joint ceilings, evaluated in declaration order.
    #[serde(default)]
    pub combined_caps: Vec<CombinedCapRule>,
}

impl ReliefPolicy {
    /// TP1 relief catalog for year of assessment 2025.
    pub fn lhdn_2025() -> Self {
        let caps = [
            ("individual", dec!(9000)),
            ("disabled_individual", dec!(7000)),
            ("spouse", dec!(4000)),
            ("alimony", dec!(4000)),
            ("disabled_spouse", dec!(6000)),
            ("parent_medical", dec!(8000)),
            ("parent_examination", dec!(1000)),
            ("support_equipment", dec!(6000)),
            ("self_education", dec!(7000)),
            ("self_education_upskilling", dec!(2000)),
            ("serious_disease_medical", dec!(10000)),
            ("vaccination", dec!(1000)),
            ("dental", dec!(1000)),
            ("medical_examination", dec!(1000)),
            ("child_learning_disability", dec!(6000)),
            ("lifestyle_reading", dec!(2500)),
            ("lifestyle_devices", dec!(2500)),
            ("lifestyle_internet", dec!(2500)),
            ("sports_equipment", dec!(1000)),
            ("sports_facility", dec!(1000)),
            ("sports_competition", dec!(1000)),
            ("breastfeeding", dec!(1000)),
            ("childcare", dec!(3000)),
            ("sspn", dec!(8000)),
            ("voluntary_epf", dec!(4000)),
            ("life_insurance", dec!(3000)),
            ("prs", dec!(3000)),
            ("education_medical_insurance", dec!(4000)),
            ("socso_eis", dec!(350)),
            ("ev_charger", dec!(2500)),
            ("home_loan_interest", dec!(7000)),
        ]
        .into_iter()
        .map(|(name, cap)| (name.to_string(), cap))
        .collect();

        Self {
            epf_relief_cap: dec!(4000),
            child_relief_per_child: dec!(2000),
            rebate: RebatePolicy::lhdn_2025(),
            caps,
            combined_caps: vec![
                CombinedCapRule::new("spouse_alimony", &["spouse", "alimony"], dec!(4000)),
                CombinedCapRule::new(
                    "parent",
                    &["parent_medical", "parent_examination"],
                    dec!(8000),
                ),
                CombinedCapRule::new(
                    "self_education",
                    &["self_education", "self_education_upskilling"],
                    dec!(7000),
                ),
                CombinedCapRule::new(
                    "medical",
                    &[
                        "serious_disease_medical",
                        "vaccination",
                        "dental",
                        "medical_examination",
                        "child_learning_disability",
                    ],
                    dec!(10000),
                ),
                CombinedCapRule::new(
                    "lifestyle",
                    &["lifestyle_reading", "lifestyle_devices", "lifestyle_internet"],
                    dec!(2500),
                ),
                CombinedCapRule::new(
                    "sports",
                    &["sports_equipment", "sports_facility", "sports_competition"],
                    dec!(1000),
                ),
                CombinedCapRule::new(
                    "epf_life_insurance",
                    &["voluntary_epf", "life_insurance"],
                    dec!(7000),
                ),
            ],
        }
    }

    /// Returns the annual cap for `category`, if defined.
    pub fn cap(&self, category: &str) -> Option<Decimal> {
        self.caps.get(category).copied()
    }

    /// Checks caps, rule membership and rebate amounts.
    ///
    /// # Errors
    ///
    /// Returns [`ReliefPolicyError`] for the first inconsistency found.
    /// Nothing is clamped.
    pub fn validate(&self) -> Result<(), ReliefPolicyError> {
        if self.epf_relief_cap < Decimal::ZERO {
            return Err(ReliefPolicyError::NegativeEpfReliefCap(self.epf_relief_cap));
        }
        check_cap("epf", self.epf_relief_cap)?;
        check_cap("child", self.child_relief_per_child)?;

        for (category, cap) in &self.caps {
            check_cap(category, *cap)?;
        }

        for rule in &self.combined_caps {
            if rule.ceiling < Decimal::ZERO {
                return Err(ReliefPolicyError::NegativeCeiling {
                    rule: rule.name.clone(),
                    ceiling: rule.ceiling,
                });
            }
            check_cap(&rule.name, rule.ceiling)?;
            if let Some(missing) = rule.members.iter().find(|m| !self.caps.contains_key(*m)) {
                return Err(ReliefPolicyError::UnknownRuleMember {
                    rule: rule.name.clone(),
                    category: missing.clone(),
                });
            }
        }

        if self.rebate.threshold < Decimal::ZERO {
            return Err(ReliefPolicyError::NegativeRebateThreshold(
                self.rebate.threshold,
            ));
        }
        for amount in [self.rebate.individual, self.rebate.spouse] {
            if amount < Decimal::ZERO {
                return Err(ReliefPolicyError::NegativeRebate(amount));
            }
        }
        Ok(())
    }
}

fn check_cap(category: &str, cap: Decimal) -> Result<(), ReliefPolicyError> {
    if cap < Decimal::ZERO {
        return Err(ReliefPolicyError::NegativeCap {
            category: category.to_string(),
            cap,
        });
    }
    if cap > MAX_PLAUSIBLE_CAP {
        return Err(ReliefPolicyError::ImplausibleCap {
            category: category.to_string(),
            cap,
            limit: MAX_PLAUSIBLE_CAP,
        });
    }
    Ok(())
}
