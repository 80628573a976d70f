use chrono::{Datelike, NaiveDate, Weekday};
use tracing::debug;

use crate::calendar::HolidayProvider;
use crate::models::{HolidayEntry, HolidayOrigin, StateCode};

/// Decides whether calendar dates count as deductible working days.
///
/// Two modes, chosen by the `states` argument:
///
/// * **Global** (no states): admin overrides on the date always exclude it.
///   Provider entries exclude it only when they are nationwide and
///   `include_national` is set; state-scoped provider entries are ignored.
/// * **Per state**: the date is excluded if it is a holiday in *any* of the
///   given states. Overrides always count; provider observances count only
///   with `include_observances`, provider entries flagged `is_national` only
///   with `include_national`, and other state holidays always count.
///
/// Weekends are never deductible.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use payroll_core::{HolidayEntry, HolidayOrigin, HolidaySet, StateCode, WorkingDayClassifier};
///
/// let sultan_birthday = NaiveDate::from_ymd_opt(2025, 12, 11).unwrap();
/// let holidays: HolidaySet = [HolidayEntry {
///     date: sultan_birthday,
///     name: "Sultan of Selangor's Birthday".to_string(),
///     origin: HolidayOrigin::Provider,
///     is_national: false,
///     is_observance: false,
///     state_scope: Some(StateCode::Selangor),
/// }]
/// .into_iter()
/// .collect();
///
/// let classifier = WorkingDayClassifier::new(&holidays);
///
/// assert!(classifier.is_deductible(sultan_birthday, None, true, true));
/// assert!(!classifier.is_deductible(sultan_birthday, Some(&[StateCode::Selangor]), true, true));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct WorkingDayClassifier<'a, P: HolidayProvider + ?Sized> {
    provider: &'a P,
}

impl<'a, P: HolidayProvider + ?Sized> WorkingDayClassifier<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Returns `true` when `date` should be deducted as a working day.
    ///
    /// An empty `states` slice behaves like `None`.
    pub fn is_deductible(
        &self,
        date: NaiveDate,
        states: Option<&[StateCode]>,
        include_observances: bool,
        include_national: bool,
    ) -> bool {
        if is_weekend(date) {
            return false;
        }

        match states {
            Some(states) if !states.is_empty() => {
                !self.is_state_holiday(date, states, include_observances, include_national)
            }
            _ => !self.is_global_holiday(date, include_observances, include_national),
        }
    }

    /// Counts deductible days in `start..=end`.
    pub fn count_deductible_days(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        states: Option<&[StateCode]>,
        include_observances: bool,
        include_national: bool,
    ) -> usize {
        self.deductible_days(start, end, states, include_observances, include_national)
            .len()
    }

    /// Lists deductible days in `start..=end`, in order. Empty when `end` is
    /// before `start`.
    pub fn deductible_days(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        states: Option<&[StateCode]>,
        include_observances: bool,
        include_national: bool,
    ) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| self.is_deductible(*day, states, include_observances, include_national))
            .collect()
    }

    fn is_global_holiday(
        &self,
        date: NaiveDate,
        include_observances: bool,
        include_national: bool,
    ) -> bool {
        let holidays = self.provider.holidays(date.year(), None);

        holidays
            .iter()
            .filter(|entry| entry.date == date)
            .any(|entry| match entry.origin {
                HolidayOrigin::Override => true,
                HolidayOrigin::Provider => {
                    entry.is_nationwide()
                        && include_national
                        && (!entry.is_observance || include_observances)
                }
            })
    }

    fn is_state_holiday(
        &self,
        date: NaiveDate,
        states: &[StateCode],
        include_observances: bool,
        include_national: bool,
    ) -> bool {
        states.iter().any(|&state| {
            let holidays = self.provider.holidays(date.year(), Some(state));
            let hit = holidays.iter().any(|entry| {
                entry.date == date
                    && counts_for_state(entry, include_observances, include_national)
            });
            if hit {
                debug!(%date, state = state.as_str(), "date is a holiday in state");
            }
            hit
        })
    }
}

fn counts_for_state(entry: &HolidayEntry, include_observances: bool, include_national: bool) -> bool {
    match entry.origin {
        HolidayOrigin::Override => true,
        HolidayOrigin::Provider if entry.is_observance => include_observances,
        HolidayOrigin::Provider if entry.is_national => include_national,
        HolidayOrigin::Provider => true,
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
