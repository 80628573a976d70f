//! Wage-band contribution rows (EPF, EIS, SOCSO).
//!
//! Published contribution schedules are piecewise tables: each row covers an
//! inclusive wage range and lists the employer and employee shares.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionKind {
    Epf,
    Eis,
    Socso,
}

impl fmt::Display for ContributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Epf => "EPF",
            Self::Eis => "EIS",
            Self::Socso => "SOCSO",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRow {
    pub kind: ContributionKind,
    /// Schedule category, e.g. `"A"` for EPF members below 60.
    pub category: String,
    pub from_wage: Decimal,
    /// Inclusive upper end; `None` for an open-ended top band.
    pub to_wage: Option<Decimal>,
    pub employer: Decimal,
    pub employee: Decimal,
    pub total: Decimal,
}

impl ContributionRow {
    pub fn covers(&self, wage: Decimal) -> bool {
        wage >= self.from_wage && self.to_wage.is_none_or(|to| wage <= to)
    }
}

/// Rows of one schedule, ordered by wage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionTable {
    rows: Vec<ContributionRow>,
}

impl ContributionTable {
    pub fn new(mut rows: Vec<ContributionRow>) -> Self {
        rows.sort_by(|a, b| a.from_wage.cmp(&b.from_wage));
        Self { rows }
    }

    /// Returns the row whose inclusive wage range contains `wage`.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use payroll_core::{ContributionKind, ContributionRow, ContributionTable};
    ///
    /// let row = |from, to, employer, employee| ContributionRow {
    ///     kind: ContributionKind::Eis,
    ///     category: "EIS".to_string(),
    ///     from_wage: from,
    ///     to_wage: to,
    ///     employer,
    ///     employee,
    ///     total: employer + employee,
    /// };
    /// let table = ContributionTable::new(vec![
    ///     row(dec!(0), Some(dec!(30)), dec!(0.05), dec!(0.05)),
    ///     row(dec!(30.01), Some(dec!(50)), dec!(0.10), dec!(0.10)),
    ///     row(dec!(6000.01), None, dec!(11.90), dec!(11.90)),
    /// ]);
    ///
    /// assert_eq!(table.lookup(dec!(30)).map(|r| r.employee), Some(dec!(0.05)));
    /// assert_eq!(table.lookup(dec!(9000)).map(|r| r.total), Some(dec!(23.80)));
    /// assert!(table.lookup(dec!(100)).is_none());
    /// ```
    pub fn lookup(&self, wage: Decimal) -> Option<&ContributionRow> {
        self.rows.iter().find(|row| row.covers(wage))
    }

    pub fn rows(&self) -> &[ContributionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
