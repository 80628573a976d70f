//! Progressive tax bands and the bracket lookup.
//!
//! A [`TaxBracketTable`] is an ordered list of [`TaxBracket`]s covering
//! `[0, ∞)`. Each bracket stores only its upper bound, so the floor of a
//! bracket is the previous bracket's upper bound (zero for the first). Upper
//! bounds are inclusive: an income exactly equal to a bound is taxed in the
//! lower bracket.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use payroll_core::TaxBracketTable;
//!
//! let table = TaxBracketTable::lhdn_2025();
//!
//! let lookup = table.lookup(dec!(190958.35));
//! assert_eq!(lookup.floor, dec!(100000));
//! assert_eq!(lookup.rate, dec!(0.25));
//! assert_eq!(lookup.base_tax, dec!(9400));
//!
//! assert_eq!(table.tax_before_rebate(dec!(190958.35)), dec!(32139.59));
//! ```

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::round_half_up;
use crate::error::ErrorKind;

/// Errors raised while building a bracket table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxTableError {
    #[error("tax bracket table is empty")]
    Empty,

    #[error("bracket {index}: upper bound {bound} is not above the previous bound")]
    NonMonotonic { index: usize, bound: Decimal },

    #[error("bracket {index} is unbounded but is not the last bracket")]
    UnboundedNotLast { index: usize },

    #[error("the last bracket must be unbounded")]
    MissingUnbounded,

    #[error("bracket {index}: floor {found} leaves a gap after {expected}")]
    Gap {
        index: usize,
        expected: Decimal,
        found: Decimal,
    },

    #[error("bracket {index}: base tax {found} does not continue the previous band (expected {expected})")]
    BaseTaxDiscontinuity {
        index: usize,
        expected: Decimal,
        found: Decimal,
    },

    #[error("bracket {index}: rate must be between 0 and 1, got {rate}")]
    RateOutOfRange { index: usize, rate: Decimal },

    #[error("bracket {index}: base tax must be non-negative, got {base_tax}")]
    NegativeBaseTax { index: usize, base_tax: Decimal },
}

impl TaxTableError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateOutOfRange { .. } | Self::NegativeBaseTax { .. } => {
                ErrorKind::ConfigurationInconsistency
            }
            _ => ErrorKind::InvalidInput,
        }
    }
}

/// One progressive band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Inclusive upper bound; `None` for the final, unbounded band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<Decimal>,

    /// Marginal rate as a fraction (`0.25` for 25%).
    pub rate: Decimal,

    /// Total tax owed on all income up to this band's floor.
    pub cumulative_base_tax: Decimal,
}

/// A bracket with its floor made explicit.
///
/// This is the shape published schedules and CSV exports use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketBand {
    pub floor: Decimal,
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
    pub base_tax: Decimal,
}

/// Result of [`TaxBracketTable::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketLookup {
    pub index: usize,
    pub floor: Decimal,
    pub rate: Decimal,
    pub base_tax: Decimal,
}

/// An ordered, validated set of progressive bands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TaxBracket>", into = "Vec<TaxBracket>")]
pub struct TaxBracketTable {
    brackets: Vec<TaxBracket>,
}

impl TaxBracketTable {
    /// Builds a table after checking ordering, coverage, rates and base-tax
    /// continuity.
    ///
    /// # Errors
    ///
    /// Returns [`TaxTableError`] describing the first offending bracket.
    pub fn new(brackets: Vec<TaxBracket>) -> Result<Self, TaxTableError> {
        validate_shape(&brackets)?;
        validate_continuity(&brackets)?;
        Ok(Self { brackets })
    }

    /// Builds a table from bands that carry an explicit floor, rejecting gaps
    /// and overlaps between consecutive bands.
    pub fn from_bands(bands: &[BracketBand]) -> Result<Self, TaxTableError> {
        let mut expected_floor = Decimal::ZERO;
        for (index, band) in bands.iter().enumerate() {
            if band.floor != expected_floor {
                return Err(TaxTableError::Gap {
                    index,
                    expected: expected_floor,
                    found: band.floor,
                });
            }
            if let Some(bound) = band.upper_bound {
                expected_floor = bound;
            }
        }

        Self::new(
            bands
                .iter()
                .map(|band| TaxBracket {
                    upper_bound: band.upper_bound,
                    rate: band.rate,
                    cumulative_base_tax: band.base_tax,
                })
                .collect(),
        )
    }

    /// Builds a table from `(upper_bound, rate)` pairs, deriving each band's
    /// cumulative base tax from the bands below it.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use payroll_core::TaxBracketTable;
    ///
    /// let table = TaxBracketTable::from_rates(&[
    ///     (Some(dec!(5000)), dec!(0)),
    ///     (Some(dec!(20000)), dec!(0.01)),
    ///     (None, dec!(0.03)),
    /// ])
    /// .unwrap();
    ///
    /// assert_eq!(table.brackets()[2].cumulative_base_tax, dec!(150.00));
    /// ```
    pub fn from_rates(rates: &[(Option<Decimal>, Decimal)]) -> Result<Self, TaxTableError> {
        let mut brackets = Vec::with_capacity(rates.len());
        let mut floor = Decimal::ZERO;
        let mut base = Decimal::ZERO;

        for &(upper_bound, rate) in rates {
            brackets.push(TaxBracket {
                upper_bound,
                rate,
                cumulative_base_tax: base,
            });
            if let Some(bound) = upper_bound {
                base = round_half_up(base + (bound - floor) * rate);
                floor = bound;
            }
        }

        Self::new(brackets)
    }

    /// The LHDN resident schedule for year of assessment 2025.
    pub fn lhdn_2025() -> Self {
        let band = |upper: Option<Decimal>, rate: Decimal, base: Decimal| TaxBracket {
            upper_bound: upper,
            rate,
            cumulative_base_tax: base,
        };

        Self {
            brackets: vec![
                band(Some(dec!(5000)), dec!(0), dec!(0)),
                band(Some(dec!(20000)), dec!(0.01), dec!(0)),
                band(Some(dec!(35000)), dec!(0.03), dec!(150)),
                band(Some(dec!(50000)), dec!(0.06), dec!(600)),
                band(Some(dec!(70000)), dec!(0.11), dec!(1500)),
                band(Some(dec!(100000)), dec!(0.19), dec!(3700)),
                band(Some(dec!(400000)), dec!(0.25), dec!(9400)),
                band(Some(dec!(600000)), dec!(0.26), dec!(84400)),
                band(Some(dec!(2000000)), dec!(0.28), dec!(136400)),
                band(None, dec!(0.30), dec!(528400)),
            ],
        }
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    pub fn len(&self) -> usize {
        self.brackets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty()
    }

    /// Iterates the table as bands with explicit floors.
    pub fn bands(&self) -> impl Iterator<Item = BracketBand> + '_ {
        self.brackets.iter().enumerate().map(|(index, bracket)| BracketBand {
            floor: self.floor_of(index),
            upper_bound: bracket.upper_bound,
            rate: bracket.rate,
            base_tax: bracket.cumulative_base_tax,
        })
    }

    /// Finds the band for chargeable income `income`.
    ///
    /// The first bracket (ascending) whose upper bound is at least `income`
    /// applies; anything above every finite bound falls into the unbounded
    /// bracket. Negative income resolves to the first bracket.
    pub fn lookup(&self, income: Decimal) -> BracketLookup {
        let last = self.brackets.len().saturating_sub(1);
        let index = self
            .brackets
            .iter()
            .position(|b| b.upper_bound.is_none_or(|bound| income <= bound))
            .unwrap_or(last);

        let bracket = &self.brackets[index];
        BracketLookup {
            index,
            floor: self.floor_of(index),
            rate: bracket.rate,
            base_tax: bracket.cumulative_base_tax,
        }
    }

    /// Gross annual tax on `income` before any rebate, rounded to the sen.
    ///
    /// Zero or negative income yields zero tax.
    pub fn tax_before_rebate(&self, income: Decimal) -> Decimal {
        if income <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let BracketLookup {
            floor,
            rate,
            base_tax,
            ..
        } = self.lookup(income);

        if income > floor {
            round_half_up((income - floor) * rate + base_tax)
        } else {
            base_tax
        }
    }

    /// Human-readable label for the band at `index`, e.g.
    /// `"RM 5,000.01 - RM 20,000.00 @ 1%"`.
    pub fn describe_bracket(&self, index: usize) -> Option<String> {
        let bracket = self.brackets.get(index)?;
        let rate = (bracket.rate * dec!(100)).normalize();

        let label = match (index, bracket.upper_bound) {
            (0, Some(upper)) => format!("RM 0.00 - RM {} @ {rate}%", Ringgit(upper)),
            (_, Some(upper)) => format!(
                "RM {} - RM {} @ {rate}%",
                Ringgit(self.floor_of(index) + dec!(0.01)),
                Ringgit(upper)
            ),
            (_, None) => format!("Above RM {} @ {rate}%", Ringgit(self.floor_of(index))),
        };
        Some(label)
    }

    fn floor_of(&self, index: usize) -> Decimal {
        index
            .checked_sub(1)
            .and_then(|prev| self.brackets[prev].upper_bound)
            .unwrap_or(Decimal::ZERO)
    }
}

impl TryFrom<Vec<TaxBracket>> for TaxBracketTable {
    type Error = TaxTableError;

    fn try_from(brackets: Vec<TaxBracket>) -> Result<Self, Self::Error> {
        Self::new(brackets)
    }
}

impl From<TaxBracketTable> for Vec<TaxBracket> {
    fn from(table: TaxBracketTable) -> Self {
        table.brackets
    }
}

fn validate_shape(brackets: &[TaxBracket]) -> Result<(), TaxTableError> {
    let last = brackets.len().checked_sub(1).ok_or(TaxTableError::Empty)?;
    let mut previous = Decimal::ZERO;

    for (index, bracket) in brackets.iter().enumerate() {
        if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE {
            return Err(TaxTableError::RateOutOfRange {
                index,
                rate: bracket.rate,
            });
        }
        if bracket.cumulative_base_tax < Decimal::ZERO {
            return Err(TaxTableError::NegativeBaseTax {
                index,
                base_tax: bracket.cumulative_base_tax,
            });
        }
        match bracket.upper_bound {
            None if index != last => return Err(TaxTableError::UnboundedNotLast { index }),
            None => {}
            Some(bound) if bound <= previous => {
                return Err(TaxTableError::NonMonotonic { index, bound });
            }
            Some(bound) => previous = bound,
        }
    }

    if brackets[last].upper_bound.is_some() {
        return Err(TaxTableError::MissingUnbounded);
    }
    Ok(())
}

fn validate_continuity(brackets: &[TaxBracket]) -> Result<(), TaxTableError> {
    if brackets[0].cumulative_base_tax != Decimal::ZERO {
        return Err(TaxTableError::BaseTaxDiscontinuity {
            index: 0,
            expected: Decimal::ZERO,
            found: brackets[0].cumulative_base_tax,
        });
    }

    let mut floor = Decimal::ZERO;
    for (index, pair) in brackets.windows(2).enumerate() {
        let (below, above) = (&pair[0], &pair[1]);
        // Shape validation guarantees every bracket but the last is bounded.
        let Some(bound) = below.upper_bound else {
            return Err(TaxTableError::UnboundedNotLast { index });
        };
        let expected = round_half_up(below.cumulative_base_tax + (bound - floor) * below.rate);
        if above.cumulative_base_tax != expected {
            return Err(TaxTableError::BaseTaxDiscontinuity {
                index: index + 1,
                expected,
                found: above.cumulative_base_tax,
            });
        }
        floor = bound;
    }
    Ok(())
}

/// Formats an amount with thousands separators and two decimals.
struct Ringgit(Decimal);

impl fmt::Display for Ringgit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fixed = format!("{:.2}", self.0);
        let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

        let digits: Vec<char> = whole.chars().collect();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, digit) in digits.iter().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(*digit);
        }
        write!(f, "{grouped}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn bracket(upper: Option<Decimal>, rate: Decimal, base: Decimal) -> TaxBracket {
        TaxBracket {
            upper_bound: upper,
            rate,
            cumulative_base_tax: base,
        }
    }

    // ── construction ─────────────────────────────────────────────────────────

    #[test]
    fn builtin_schedule_passes_validation() {
        let builtin = TaxBracketTable::lhdn_2025();

        let rebuilt = TaxBracketTable::new(builtin.brackets().to_vec());

        assert_eq!(rebuilt, Ok(builtin));
    }

    #[test]
    fn from_rates_reproduces_builtin_schedule() {
        let rates: Vec<_> = TaxBracketTable::lhdn_2025()
            .brackets()
            .iter()
            .map(|b| (b.upper_bound, b.rate))
            .collect();

        let derived = TaxBracketTable::from_rates(&rates).unwrap();

        assert_eq!(derived, TaxBracketTable::lhdn_2025());
    }

    #[test]
    fn rejects_empty_table() {
        assert_eq!(TaxBracketTable::new(vec![]), Err(TaxTableError::Empty));
    }

    #[test]
    fn rejects_non_monotonic_bounds() {
        let result = TaxBracketTable::new(vec![
            bracket(Some(dec!(5000)), dec!(0), dec!(0)),
            bracket(Some(dec!(5000)), dec!(0.01), dec!(0)),
            bracket(None, dec!(0.03), dec!(0)),
        ]);

        assert_eq!(
            result,
            Err(TaxTableError::NonMonotonic {
                index: 1,
                bound: dec!(5000)
            })
        );
    }

    #[test]
    fn rejects_unbounded_bracket_before_the_end() {
        let result = TaxBracketTable::new(vec![
            bracket(None, dec!(0), dec!(0)),
            bracket(Some(dec!(5000)), dec!(0.01), dec!(0)),
        ]);

        assert_eq!(result, Err(TaxTableError::UnboundedNotLast { index: 0 }));
    }

    #[test]
    fn rejects_table_without_unbounded_bracket() {
        let result = TaxBracketTable::new(vec![bracket(Some(dec!(5000)), dec!(0), dec!(0))]);

        assert_eq!(result, Err(TaxTableError::MissingUnbounded));
    }

    #[test]
    fn rejects_rate_above_one() {
        let result = TaxBracketTable::new(vec![bracket(None, dec!(1.5), dec!(0))]);

        assert_eq!(
            result,
            Err(TaxTableError::RateOutOfRange {
                index: 0,
                rate: dec!(1.5)
            })
        );
        assert_eq!(
            result.unwrap_err().kind(),
            ErrorKind::ConfigurationInconsistency
        );
    }

    #[test]
    fn rejects_base_tax_discontinuity() {
        let result = TaxBracketTable::new(vec![
            bracket(Some(dec!(5000)), dec!(0), dec!(0)),
            bracket(Some(dec!(20000)), dec!(0.01), dec!(0)),
            bracket(None, dec!(0.03), dec!(200)),
        ]);

        assert_eq!(
            result,
            Err(TaxTableError::BaseTaxDiscontinuity {
                index: 2,
                expected: dec!(150),
                found: dec!(200)
            })
        );
    }

    #[test]
    fn from_bands_rejects_gap() {
        let bands = [
            BracketBand {
                floor: dec!(0),
                upper_bound: Some(dec!(5000)),
                rate: dec!(0),
                base_tax: dec!(0),
            },
            BracketBand {
                floor: dec!(6000),
                upper_bound: None,
                rate: dec!(0.01),
                base_tax: dec!(0),
            },
        ];

        let result = TaxBracketTable::from_bands(&bands);

        assert_eq!(
            result,
            Err(TaxTableError::Gap {
                index: 1,
                expected: dec!(5000),
                found: dec!(6000)
            })
        );
    }

    #[test]
    fn bands_round_trip_through_from_bands() {
        let table = TaxBracketTable::lhdn_2025();
        let bands: Vec<_> = table.bands().collect();

        assert_eq!(bands[6].floor, dec!(100000));
        assert_eq!(TaxBracketTable::from_bands(&bands), Ok(table));
    }

    // ── lookup ───────────────────────────────────────────────────────────────

    #[test]
    fn upper_bound_is_inclusive() {
        let table = TaxBracketTable::lhdn_2025();

        let at_bound = table.lookup(dec!(35000));
        let above_bound = table.lookup(dec!(35000.01));

        assert_eq!(at_bound.index, 2);
        assert_eq!(at_bound.rate, dec!(0.03));
        assert_eq!(above_bound.index, 3);
        assert_eq!(above_bound.floor, dec!(35000));
    }

    #[test]
    fn income_above_all_bounds_uses_unbounded_bracket() {
        let lookup = TaxBracketTable::lhdn_2025().lookup(dec!(5000000));

        assert_eq!(lookup.index, 9);
        assert_eq!(lookup.floor, dec!(2000000));
        assert_eq!(lookup.rate, dec!(0.30));
        assert_eq!(lookup.base_tax, dec!(528400));
    }

    #[test]
    fn zero_and_negative_income_owe_nothing() {
        let table = TaxBracketTable::lhdn_2025();

        assert_eq!(table.tax_before_rebate(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(table.tax_before_rebate(dec!(-100)), Decimal::ZERO);
    }

    #[test]
    fn tax_matches_published_schedule() {
        let table = TaxBracketTable::lhdn_2025();

        assert_eq!(table.tax_before_rebate(dec!(5000)), dec!(0));
        assert_eq!(table.tax_before_rebate(dec!(20000)), dec!(150));
        assert_eq!(table.tax_before_rebate(dec!(48000)), dec!(1380));
        assert_eq!(table.tax_before_rebate(dec!(190958.35)), dec!(32139.59));
        assert_eq!(table.tax_before_rebate(dec!(2500000)), dec!(678400));
    }

    #[test]
    fn tax_is_continuous_at_every_boundary() {
        let table = TaxBracketTable::lhdn_2025();

        for pair in table.brackets().windows(2) {
            let bound = pair[0].upper_bound.unwrap();

            let at_bound = table.tax_before_rebate(bound);

            assert_eq!(at_bound, pair[1].cumulative_base_tax, "boundary {bound}");
        }
    }

    // ── describe ─────────────────────────────────────────────────────────────

    #[test]
    fn describes_bands() {
        let table = TaxBracketTable::lhdn_2025();

        assert_eq!(
            table.describe_bracket(0).as_deref(),
            Some("RM 0.00 - RM 5,000.00 @ 0%")
        );
        assert_eq!(
            table.describe_bracket(1).as_deref(),
            Some("RM 5,000.01 - RM 20,000.00 @ 1%")
        );
        assert_eq!(
            table.describe_bracket(9).as_deref(),
            Some("Above RM 2,000,000.00 @ 30%")
        );
        assert_eq!(table.describe_bracket(10), None);
    }

    // ── serde ────────────────────────────────────────────────────────────────

    #[test]
    fn deserializing_invalid_table_fails() {
        let brackets = vec![bracket(Some(dec!(5000)), dec!(0), dec!(0))];

        let result = TaxBracketTable::try_from(brackets);

        assert_eq!(result, Err(TaxTableError::MissingUnbounded));
    }
}
