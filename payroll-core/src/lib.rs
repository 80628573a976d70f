//! Malaysian statutory payroll engine.
//!
//! `payroll-core` computes PCB (monthly tax deduction) figures from a
//! year-to-date snapshot and an immutable [`TaxConfig`], and classifies
//! calendar dates as deductible working days for unpaid-leave handling.
//! It performs no I/O; loading configuration and holiday data lives in
//! `payroll-data`.

pub mod calculations;
pub mod calendar;
pub mod error;
pub mod models;

pub use calculations::{
    PcbBreakdown, PcbCalculator, PcbError, PayrollOutcome, PayrollRequest, compute_batch,
    compute_monthly_pcb,
};
pub use calendar::{HolidayProvider, WorkingDayClassifier};
pub use error::{ErrorKind, PayrollError};
pub use models::*;
