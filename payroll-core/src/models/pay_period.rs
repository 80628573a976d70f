use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayPeriodError {
    #[error("month must be between 1 and 12, got {0}")]
    MonthOutOfRange(u32),

    #[error("pay period '{0}' is not in MM/YYYY form")]
    Malformed(String),
}

/// A monthly pay period.
///
/// Constructed through [`PayPeriod::new`] or parsed from `"MM/YYYY"`, so the
/// month is always within `1..=12`.
///
/// # Example
///
/// ```
/// use payroll_core::PayPeriod;
///
/// let period: PayPeriod = "11/2025".parse().unwrap();
///
/// assert_eq!(period.month(), 11);
/// assert_eq!(period.remaining_months(), 1);
/// assert_eq!(period.divisor(), 2);
/// assert_eq!(period.to_string(), "11/2025");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PayPeriod {
    year: i32,
    month: u32,
}

impl PayPeriod {
    pub fn new(month: u32, year: i32) -> Result<Self, PayPeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PayPeriodError::MonthOutOfRange(month));
        }
        Ok(Self { year, month })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Whole months left in the year after this one (`n`).
    pub fn remaining_months(&self) -> u32 {
        12 - self.month
    }

    /// Months from this one to year end inclusive (`n + 1`).
    pub fn divisor(&self) -> u32 {
        self.remaining_months() + 1
    }

    /// The following period, rolling into January of the next year.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

impl FromStr for PayPeriod {
    type Err = PayPeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PayPeriodError::Malformed(s.to_string());

        let (month, year) = s.trim().split_once('/').ok_or_else(malformed)?;
        let month: u32 = month.trim().parse().map_err(|_| malformed())?;
        let year: i32 = year.trim().parse().map_err(|_| malformed())?;

        Self::new(month, year)
    }
}

impl TryFrom<String> for PayPeriod {
    type Error = PayPeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PayPeriod> for String {
    fn from(period: PayPeriod) -> Self {
        period.to_string()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn december_has_no_remaining_months() {
        let december = PayPeriod::new(12, 2025).unwrap();

        assert_eq!(december.remaining_months(), 0);
        assert_eq!(december.divisor(), 1);
    }

    #[test]
    fn january_has_eleven_remaining_months() {
        let january = PayPeriod::new(1, 2025).unwrap();

        assert_eq!(january.remaining_months(), 11);
        assert_eq!(january.divisor(), 12);
    }

    #[test]
    fn rejects_month_out_of_range() {
        assert_eq!(PayPeriod::new(0, 2025), Err(PayPeriodError::MonthOutOfRange(0)));
        assert_eq!(PayPeriod::new(13, 2025), Err(PayPeriodError::MonthOutOfRange(13)));
    }

    #[test]
    fn parses_single_digit_month() {
        let period: PayPeriod = "3/2025".parse().unwrap();

        assert_eq!(period, PayPeriod::new(3, 2025).unwrap());
        assert_eq!(period.to_string(), "03/2025");
    }

    #[test]
    fn rejects_malformed_text() {
        assert_eq!(
            "2025-03".parse::<PayPeriod>(),
            Err(PayPeriodError::Malformed("2025-03".to_string()))
        );
        assert_eq!(
            "13/2025".parse::<PayPeriod>(),
            Err(PayPeriodError::MonthOutOfRange(13))
        );
    }

    #[test]
    fn next_rolls_over_year_end() {
        let december = PayPeriod::new(12, 2025).unwrap();

        assert_eq!(december.next(), PayPeriod::new(1, 2026).unwrap());
        assert_eq!(
            PayPeriod::new(6, 2025).unwrap().next(),
            PayPeriod::new(7, 2025).unwrap()
        );
    }
}
