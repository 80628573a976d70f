//! Crate-level error type.
//!
//! Each module reports failures through its own `thiserror` enum. They all
//! convert into [`PayrollError`], which callers can classify with
//! [`PayrollError::kind`] to tell bad payroll data apart from a bad
//! configuration snapshot.

use thiserror::Error;

use crate::calculations::PcbError;
use crate::models::{PayPeriodError, ReliefPolicyError, TaxConfigError, TaxTableError};

/// Broad classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The payroll data or the table shape is malformed.
    InvalidInput,

    /// A configuration value is outside what the engine accepts. Such values
    /// are rejected and never clamped.
    ConfigurationInconsistency,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayrollError {
    #[error(transparent)]
    TaxTable(#[from] TaxTableError),

    #[error(transparent)]
    ReliefPolicy(#[from] ReliefPolicyError),

    #[error(transparent)]
    PayPeriod(#[from] PayPeriodError),

    #[error(transparent)]
    TaxConfig(#[from] TaxConfigError),

    #[error(transparent)]
    Pcb(#[from] PcbError),
}

impl PayrollError {
    /// Returns the classification of the underlying error.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_core::{ErrorKind, PayPeriod, PayrollError};
    ///
    /// let err: PayrollError = PayPeriod::new(13, 2025).unwrap_err().into();
    /// assert_eq!(err.kind(), ErrorKind::InvalidInput);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TaxTable(e) => e.kind(),
            Self::ReliefPolicy(e) => e.kind(),
            Self::PayPeriod(_) => ErrorKind::InvalidInput,
            Self::TaxConfig(e) => e.kind(),
            Self::Pcb(e) => e.kind(),
        }
    }
}
