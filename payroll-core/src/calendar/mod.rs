//! Working-day classification for unpaid-leave deductions.
//!
//! A date is deductible when it is a normal working day for the employee:
//! not a weekend and not a holiday that applies to them. Holiday data comes
//! from any [`HolidayProvider`]; [`HolidaySet`] is the in-memory one.

mod classifier;

pub use classifier::WorkingDayClassifier;

use crate::models::{HolidayEntry, HolidaySet, StateCode};

/// Source of holiday entries for the classifier.
pub trait HolidayProvider {
    /// Entries dated in `year`. With a `state`, only entries that apply to
    /// that state (its own plus nationwide ones); without one, every entry.
    fn holidays(&self, year: i32, state: Option<StateCode>) -> Vec<&HolidayEntry>;
}

impl HolidayProvider for HolidaySet {
    fn holidays(&self, year: i32, state: Option<StateCode>) -> Vec<&HolidayEntry> {
        self.entries_in_year(year)
            .filter(|entry| state.is_none_or(|s| entry.applies_to(s)))
            .collect()
    }
}
