mod contribution;
mod holiday;
mod pay_period;
mod payroll_inputs;
mod relief_policy;
mod tax_bracket;
mod tax_config;

pub use contribution::{ContributionKind, ContributionRow, ContributionTable};
pub use holiday::{HolidayEntry, HolidayOrigin, HolidaySet, StateCode, UnknownStateError};
pub use pay_period::{PayPeriod, PayPeriodError};
pub use payroll_inputs::PayrollInputs;
pub use relief_policy::{
    CombinedCapRule, MAX_PLAUSIBLE_CAP, RebatePolicy, ReliefPolicy, ReliefPolicyError,
};
pub use tax_bracket::{BracketBand, BracketLookup, TaxBracket, TaxBracketTable, TaxTableError};
pub use tax_config::{TaxConfig, TaxConfigError, check_non_resident_rate};
