//! File-based loaders for the payroll engine.
//!
//! Reads tax configuration from TOML, bracket schedules and holiday lists
//! from CSV, and turns published EPF/EIS contribution schedules into
//! [`payroll_core::ContributionTable`]s.

mod amounts;
mod brackets;
mod config;
mod contributions;
mod holidays;

pub use amounts::{ParseAmountError, parse_amount};
pub use brackets::{TaxBracketLoader, TaxBracketLoaderError, TaxBracketRecord};
pub use config::{ConfigLoadError, TaxConfigLoader};
pub use contributions::{
    ContributionParseError, ContributionTableParser, ParseReport, RowFailure, WageRange,
    parse_wage_range,
};
pub use holidays::{
    HolidayAction, HolidayCsvLoader, HolidayKind, HolidayLoadError, HolidayRecord,
    extend_multi_day_holidays,
};
