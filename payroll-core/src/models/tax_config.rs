use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ErrorKind, PayrollError};
use crate::models::{ReliefPolicy, TaxBracketTable};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaxConfigError {
    #[error("non-resident rate must be between 0 and 1, got {0}")]
    NonResidentRateOutOfRange(Decimal),

    #[error("configuration version label must not be empty")]
    EmptyVersion,
}

impl TaxConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ConfigurationInconsistency
    }
}

/// Checks that a flat non-resident rate lies in `0..=1`.
pub fn check_non_resident_rate(rate: Decimal) -> Result<(), TaxConfigError> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(TaxConfigError::NonResidentRateOutOfRange(rate));
    }
    Ok(())
}

/// Immutable configuration snapshot for one year of assessment.
///
/// A payroll run captures one of these by value, so later edits to the live
/// configuration cannot change figures that were already computed.
///
/// # Example
///
/// ```
/// use payroll_core::TaxConfig;
///
/// let config = TaxConfig::lhdn_2025();
///
/// assert_eq!(config.tax_year, 2025);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxConfig {
    pub tax_year: i32,

    /// Free-form label identifying this revision of the configuration.
    pub version: String,

    /// Flat rate applied to non-resident employees.
    pub non_resident_rate: Decimal,

    pub brackets: TaxBracketTable,

    pub policy: ReliefPolicy,
}

impl TaxConfig {
    pub fn lhdn_2025() -> Self {
        Self {
            tax_year: 2025,
            version: "lhdn-2025".to_string(),
            non_resident_rate: dec!(0.30),
            brackets: TaxBracketTable::lhdn_2025(),
            policy: ReliefPolicy::lhdn_2025(),
        }
    }

    /// Validates the snapshot. The bracket table is already checked when it
    /// is built or deserialized.
    pub fn validate(&self) -> Result<(), PayrollError> {
        if self.version.trim().is_empty() {
            return Err(TaxConfigError::EmptyVersion.into());
        }
        check_non_resident_rate(self.non_resident_rate)?;
        self.policy.validate()?;
        Ok(())
    }
}
