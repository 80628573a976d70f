//! EPF/EIS contribution schedule parsing.
//!
//! Published schedules come as tables extracted from PDF or spreadsheet
//! exports: one row per wage band with the employer, employee and total
//! contribution. Extraction is messy, so parsing is partial-success: rows that
//! cannot be read (bad amounts, invalid UTF-8, garbled ranges) are collected
//! in the [`ParseReport`] with their line number and the rest of the table is
//! still returned. Only a missing column or an unreadable source aborts.
//!
//! Column headers are matched loosely, so both the EPF layout
//! (`Amount of Wages (RM)`, `Employer Contribution (RM)`, ...) and the EIS
//! layout (`Actual Monthly Wage (RM)`, `Employer's Contribution (RM)`, ...)
//! are accepted. A header repeated after a page break is skipped.
//!
//! EPF exports carry several schedules in one file, each introduced by a
//! `PART A` .. `PART E` line. Rows are tagged with the part they appear under;
//! the parser's category only applies before the first marker.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use calamine::{Reader, open_workbook_auto};
use payroll_core::{ContributionKind, ContributionRow, ContributionTable};
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::amounts::parse_amount;

static BOUNDED_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:rm\s*)?([\d,]+(?:\.\d+)?)\s*(?:-|–|—|to)\s*(?:rm\s*)?([\d,]+(?:\.\d+)?)$")
        .expect("bounded range pattern is valid")
});

static OPEN_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:rm\s*)?([\d,]+(?:\.\d+)?)\s*(?:and\s+above|and\s+over|above|\+)$")
        .expect("open range pattern is valid")
});

static PART_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:part|bahagian)\s*([a-e])\b").expect("part marker pattern is valid")
});

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Errors that abort parsing of a whole table.
#[derive(Debug, Error)]
pub enum ContributionParseError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("workbook has no worksheets")]
    EmptyWorkbook,

    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no '{0}' column found in header")]
    MissingColumn(&'static str),
}

impl From<csv::Error> for ContributionParseError {
    fn from(err: csv::Error) -> Self {
        ContributionParseError::CsvParse(err.to_string())
    }
}

impl From<calamine::Error> for ContributionParseError {
    fn from(err: calamine::Error) -> Self {
        ContributionParseError::Spreadsheet(err.to_string())
    }
}

/// A row that could not be turned into a [`ContributionRow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    /// 1-based line number in the source.
    pub line: u64,
    /// The row's cells joined with `,`.
    pub raw: String,
    pub reason: String,
}

/// Result of parsing one schedule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseReport {
    pub rows: Vec<ContributionRow>,
    pub failures: Vec<RowFailure>,
    /// Rows skipped because their wage range was already seen in the same
    /// category.
    pub duplicates: usize,
}

impl ParseReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Categories present in the parsed rows, in the order they first appear.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !categories.contains(&row.category.as_str()) {
                categories.push(&row.category);
            }
        }
        categories
    }

    /// Lookup table over the rows of one category.
    pub fn table_for(&self, category: &str) -> ContributionTable {
        ContributionTable::new(
            self.rows
                .iter()
                .filter(|row| row.category == category)
                .cloned()
                .collect(),
        )
    }

    /// Lookup table over every row. Only meaningful for single-category
    /// schedules; use [`ParseReport::table_for`] otherwise.
    pub fn into_table(self) -> ContributionTable {
        ContributionTable::new(self.rows)
    }
}

/// Inclusive wage band parsed from a range cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WageRange {
    pub from: Decimal,
    pub to: Option<Decimal>,
}

/// Parses a wage-range cell such as `"10.01 - 20.00"`, `"RM30.01 to RM50.00"`
/// or `"6,000.01 and above"`.
pub fn parse_wage_range(cell: &str) -> Option<WageRange> {
    let cell = cell.trim();

    if let Some(caps) = BOUNDED_RANGE.captures(cell) {
        let from = parse_amount(&caps[1]).ok()?;
        let to = parse_amount(&caps[2]).ok()?;
        return (from <= to).then_some(WageRange { from, to: Some(to) });
    }

    let caps = OPEN_RANGE.captures(cell)?;
    let from = parse_amount(&caps[1]).ok()?;
    Some(WageRange { from, to: None })
}

struct Columns {
    wage: usize,
    employer: usize,
    employee: usize,
    total: usize,
}

impl Columns {
    fn locate(headers: &[String]) -> Result<Self, ContributionParseError> {
        let find = |needle: &str| {
            headers
                .iter()
                .position(|h| h.to_lowercase().contains(needle))
        };

        Ok(Self {
            wage: find("wage").ok_or(ContributionParseError::MissingColumn("wage"))?,
            employer: find("employer").ok_or(ContributionParseError::MissingColumn("employer"))?,
            employee: find("employee").ok_or(ContributionParseError::MissingColumn("employee"))?,
            total: find("total").ok_or(ContributionParseError::MissingColumn("total"))?,
        })
    }
}

/// One row as read from the source, before interpretation.
enum SourceRow {
    Cells { line: u64, cells: Vec<String> },
    Unreadable(RowFailure),
}

fn is_header(cells: &[String]) -> bool {
    cells.iter().any(|cell| cell.to_lowercase().contains("wage"))
}

/// Returns the part letter when the row's first non-empty cell opens a new
/// schedule part (`PART A`, `Part C (...)`, `BAHAGIAN E`).
fn part_marker(cells: &[String]) -> Option<String> {
    let first = cells.iter().find(|cell| !cell.is_empty())?;
    let caps = PART_MARKER.captures(first.trim())?;
    Some(caps[1].to_uppercase())
}

fn decode_record(record: &csv::ByteRecord) -> SourceRow {
    let line = record.position().map(|p| p.line()).unwrap_or_default();
    let cells: Result<Vec<String>, _> = record
        .iter()
        .map(|field| std::str::from_utf8(field).map(str::to_string))
        .collect();

    match cells {
        Ok(cells) => SourceRow::Cells { line, cells },
        Err(err) => SourceRow::Unreadable(RowFailure {
            line,
            raw: record
                .iter()
                .map(String::from_utf8_lossy)
                .collect::<Vec<_>>()
                .join(","),
            reason: format!("invalid UTF-8: {err}"),
        }),
    }
}

fn default_category(kind: ContributionKind) -> &'static str {
    match kind {
        ContributionKind::Epf => "A",
        ContributionKind::Eis => "EIS",
        ContributionKind::Socso => "1",
    }
}

/// Parser for one published contribution schedule.
///
/// # Example
///
/// ```
/// use payroll_core::ContributionKind;
/// use payroll_data::ContributionTableParser;
///
/// let csv = "\
/// Actual Monthly Wage (RM),Employer's Contribution (RM),Employee's Contribution (RM),Total Contribution (RM)
/// 0.00 - 30.00,0.05,0.05,0.10
/// 30.01 - 50.00,0.10,0.10,0.20
/// not a range,0.10,0.10,0.20
/// ";
///
/// let report = ContributionTableParser::new(ContributionKind::Eis, "EIS")
///     .parse(csv.as_bytes())
///     .unwrap();
///
/// assert_eq!(report.rows.len(), 2);
/// assert_eq!(report.failures.len(), 1);
/// assert_eq!(report.failures[0].line, 4);
/// ```
#[derive(Debug, Clone)]
pub struct ContributionTableParser {
    kind: ContributionKind,
    category: String,
}

impl ContributionTableParser {
    /// `category` tags rows that appear before any `PART` marker.
    pub fn new(kind: ContributionKind, category: &str) -> Self {
        Self {
            kind,
            category: category.to_string(),
        }
    }

    /// Parser with the scheme's usual first category: Part A for EPF, `EIS`
    /// for EIS and category 1 for SOCSO.
    pub fn for_kind(kind: ContributionKind) -> Self {
        Self::new(kind, default_category(kind))
    }

    /// Parses a schedule exported as CSV.
    ///
    /// # Errors
    ///
    /// Fails only when no header row is found, a header lacks a required
    /// column, or the underlying reader fails. Bad rows, including rows that
    /// are not valid UTF-8, end up in [`ParseReport::failures`].
    pub fn parse<R: Read>(&self, reader: R) -> Result<ParseReport, ContributionParseError> {
        let csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let rows = csv_reader
            .into_byte_records()
            .map(|result| match result {
                Ok(record) => Ok(decode_record(&record)),
                Err(err) if err.is_io_error() => Err(ContributionParseError::from(err)),
                Err(err) => Ok(SourceRow::Unreadable(RowFailure {
                    line: err.position().map(|p| p.line()).unwrap_or_default(),
                    raw: String::new(),
                    reason: err.to_string(),
                })),
            });

        self.collect(rows)
    }

    /// Parses the first worksheet of an Excel or OpenDocument workbook.
    ///
    /// Line numbers in the report are worksheet row numbers.
    pub fn parse_spreadsheet(&self, path: &Path) -> Result<ParseReport, ContributionParseError> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(ContributionParseError::EmptyWorkbook)??;
        let first_row = range.start().map_or(0, |(row, _)| row);

        let rows = range
            .rows()
            .zip(u64::from(first_row) + 1..)
            .map(|(cells, line)| {
                Ok(SourceRow::Cells {
                    line,
                    cells: cells
                        .iter()
                        .map(|cell| cell.to_string().trim().to_string())
                        .collect(),
                })
            });

        self.collect(rows)
    }

    /// Parses a schedule file, picking the reader from its extension.
    /// Anything that is not a known workbook format is read as CSV.
    pub fn parse_file(&self, path: &Path) -> Result<ParseReport, ContributionParseError> {
        let is_workbook = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SPREADSHEET_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
        if is_workbook {
            return self.parse_spreadsheet(path);
        }

        let file = File::open(path).map_err(|source| ContributionParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(file)
    }

    fn collect<I>(&self, rows: I) -> Result<ParseReport, ContributionParseError>
    where
        I: IntoIterator<Item = Result<SourceRow, ContributionParseError>>,
    {
        let mut report = ParseReport::default();
        let mut columns: Option<Columns> = None;
        let mut category = self.category.clone();
        let mut seen = HashSet::new();

        for row in rows {
            let (line, cells) = match row? {
                SourceRow::Cells { line, cells } => (line, cells),
                SourceRow::Unreadable(failure) => {
                    warn!(line = failure.line, kind = %self.kind, reason = %failure.reason, "skipping unreadable row");
                    report.failures.push(failure);
                    continue;
                }
            };
            if cells.iter().all(String::is_empty) {
                continue;
            }
            if let Some(part) = part_marker(&cells) {
                debug!(line, %part, "entering schedule part");
                category = part;
                continue;
            }
            if is_header(&cells) {
                columns = Some(Columns::locate(&cells)?);
                continue;
            }
            let Some(current) = &columns else {
                debug!(line, "skipping row before header");
                continue;
            };

            match self.parse_row(&cells, current, &category) {
                Ok(row) => {
                    if seen.insert((row.category.clone(), row.from_wage, row.to_wage)) {
                        report.rows.push(row);
                    } else {
                        warn!(line, kind = %self.kind, "skipping duplicate wage range");
                        report.duplicates += 1;
                    }
                }
                Err(reason) => {
                    warn!(line, kind = %self.kind, %reason, "skipping unreadable row");
                    report.failures.push(RowFailure {
                        line,
                        raw: cells.join(","),
                        reason,
                    });
                }
            }
        }

        if columns.is_none() {
            return Err(ContributionParseError::MissingColumn("wage"));
        }

        info!(
            kind = %self.kind,
            categories = ?report.categories(),
            rows = report.rows.len(),
            failures = report.failures.len(),
            duplicates = report.duplicates,
            "parsed contribution schedule"
        );
        Ok(report)
    }

    fn parse_row(
        &self,
        cells: &[String],
        columns: &Columns,
        category: &str,
    ) -> Result<ContributionRow, String> {
        let cell = |index: usize, name: &str| {
            cells
                .get(index)
                .map(String::as_str)
                .ok_or_else(|| format!("missing {name} cell"))
        };
        let amount = |index: usize, name: &str| {
            cell(index, name).and_then(|raw| parse_amount(raw).map_err(|e| format!("{name}: {e}")))
        };

        let wage_cell = cell(columns.wage, "wage")?;
        let range = parse_wage_range(wage_cell)
            .ok_or_else(|| format!("unrecognised wage range '{wage_cell}'"))?;
        let employer = amount(columns.employer, "employer")?;
        let employee = amount(columns.employee, "employee")?;
        let total = amount(columns.total, "total")?;

        if employer + employee != total {
            warn!(
                from = %range.from,
                %employer,
                %employee,
                %total,
                "published total differs from the sum of shares"
            );
        }

        Ok(ContributionRow {
            kind: self.kind,
            category: category.to_string(),
            from_wage: range.from,
            to_wage: range.to,
            employer,
            employee,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const EPF_HEADER: &str = "Amount of Wages (RM),Employer Contribution (RM),Employee Contribution (RM),Total Contribution (RM)";

    // ── parse_wage_range ─────────────────────────────────────────────────────

    #[test]
    fn parses_bounded_ranges() {
        assert_eq!(
            parse_wage_range("10.01 - 20.00"),
            Some(WageRange {
                from: dec!(10.01),
                to: Some(dec!(20.00))
            })
        );
        assert_eq!(
            parse_wage_range("RM1,000.01 to RM1,100.00"),
            Some(WageRange {
                from: dec!(1000.01),
                to: Some(dec!(1100.00))
            })
        );
        assert_eq!(
            parse_wage_range("5000.01–5100.00"),
            Some(WageRange {
                from: dec!(5000.01),
                to: Some(dec!(5100.00))
            })
        );
    }

    #[test]
    fn parses_open_ended_range() {
        assert_eq!(
            parse_wage_range("6000.01 and above"),
            Some(WageRange {
                from: dec!(6000.01),
                to: None
            })
        );
    }

    #[test]
    fn rejects_inverted_or_garbled_ranges() {
        assert_eq!(parse_wage_range("20.00 - 10.01"), None);
        assert_eq!(parse_wage_range("Wages"), None);
        assert_eq!(parse_wage_range(""), None);
    }

    // ── ContributionTableParser ──────────────────────────────────────────────

    #[test]
    fn parses_epf_layout() {
        let csv = format!("{EPF_HEADER}\n0.01 - 10.00,NIL,NIL,NIL\n10.01 - 20.00,3.00,3.00,6.00\n");

        let report = ContributionTableParser::new(ContributionKind::Epf, "A")
            .parse(csv.as_bytes())
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].employer, Decimal::ZERO);
        assert_eq!(report.rows[1].total, dec!(6.00));
        assert_eq!(report.rows[1].category, "A");
    }

    #[test]
    fn skips_duplicate_ranges() {
        let csv = format!(
            "{EPF_HEADER}\n10.01 - 20.00,3.00,3.00,6.00\n10.01 - 20.00,3.00,3.00,6.00\n"
        );

        let report = ContributionTableParser::new(ContributionKind::Epf, "A")
            .parse(csv.as_bytes())
            .unwrap();

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.duplicates, 1);
        assert!(report.is_clean());
    }

    #[test]
    fn collects_row_failures_and_keeps_going() {
        let csv = format!(
            "{EPF_HEADER}\n10.01 - 20.00,3.00,3.00,6.00\n20.01 - 40.00,six,5.00,11.00\n40.01 - 60.00,8.00\n60.01 - 80.00,11.00,9.00,20.00\n"
        );

        let report = ContributionTableParser::new(ContributionKind::Epf, "A")
            .parse(csv.as_bytes())
            .unwrap();

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].line, 3);
        assert_eq!(report.failures[0].raw, "20.01 - 40.00,six,5.00,11.00");
        assert!(report.failures[0].reason.contains("employer"));
        assert_eq!(report.failures[1].line, 4);
        assert!(report.failures[1].reason.contains("missing employee cell"));
    }

    #[test]
    fn blank_rows_are_ignored() {
        let csv = format!("{EPF_HEADER}\n,,,\n10.01 - 20.00,3.00,3.00,6.00\n");

        let report = ContributionTableParser::new(ContributionKind::Epf, "A")
            .parse(csv.as_bytes())
            .unwrap();

        assert_eq!(report.rows.len(), 1);
        assert!(report.is_clean());
    }

    #[test]
    fn missing_column_is_fatal() {
        let csv = "Amount of Wages (RM),Employer Contribution (RM),Total Contribution (RM)\n";

        let err = ContributionTableParser::new(ContributionKind::Epf, "A")
            .parse(csv.as_bytes())
            .unwrap_err();

        assert!(matches!(err, ContributionParseError::MissingColumn("employee")));
    }

    #[test]
    fn report_converts_into_lookup_table() {
        let csv = format!("{EPF_HEADER}\n20.01 - 40.00,6.00,5.00,11.00\n10.01 - 20.00,3.00,3.00,6.00\n");

        let table = ContributionTableParser::new(ContributionKind::Epf, "A")
            .parse(csv.as_bytes())
            .unwrap()
            .into_table();

        assert_eq!(table.lookup(dec!(15)).map(|r| r.employee), Some(dec!(3.00)));
        assert_eq!(table.lookup(dec!(40)).map(|r| r.employee), Some(dec!(5.00)));
    }

    #[test]
    fn invalid_utf8_row_is_recorded_and_parsing_continues() {
        let csv = [
            EPF_HEADER.as_bytes(),
            b"\n10.01 - 20.00,3.00,3.00,6.00\n20.01 - 40.00,6.\xff00,5.00,11.00\n40.01 - 60.00,8.00,7.00,15.00\n".as_slice(),
        ]
        .concat();

        let report = ContributionTableParser::new(ContributionKind::Epf, "A")
            .parse(csv.as_slice())
            .unwrap();

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[1].from_wage, dec!(40.01));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].line, 3);
        assert!(report.failures[0].reason.starts_with("invalid UTF-8"));
        assert!(report.failures[0].raw.starts_with("20.01 - 40.00,6.\u{FFFD}00"));
    }

    #[test]
    fn repeated_header_after_page_break_is_skipped() {
        let csv = format!(
            "{EPF_HEADER}\n10.01 - 20.00,3.00,3.00,6.00\n{EPF_HEADER}\n20.01 - 40.00,6.00,5.00,11.00\n"
        );

        let report = ContributionTableParser::new(ContributionKind::Epf, "A")
            .parse(csv.as_bytes())
            .unwrap();

        assert_eq!(report.rows.len(), 2);
        assert!(report.is_clean());
    }

    #[test]
    fn no_header_row_is_fatal() {
        let csv = "10.01 - 20.00,3.00,3.00,6.00\n";

        let err = ContributionTableParser::new(ContributionKind::Epf, "A")
            .parse(csv.as_bytes())
            .unwrap_err();

        assert!(matches!(err, ContributionParseError::MissingColumn("wage")));
    }

    // ── schedule parts ───────────────────────────────────────────────────────

    #[test]
    fn part_markers_tag_following_rows() {
        let csv = format!(
            "THIRD SCHEDULE,,,\n\
             PART A,,,\n\
             {EPF_HEADER}\n\
             10.01 - 20.00,3.00,3.00,6.00\n\
             Part C (employees aged 60 and above),,,\n\
             {EPF_HEADER}\n\
             10.01 - 20.00,1.00,0.00,1.00\n\
             20.01 - 40.00,2.00,0.00,2.00\n"
        );

        let report = ContributionTableParser::for_kind(ContributionKind::Epf)
            .parse(csv.as_bytes())
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.duplicates, 0);
        assert_eq!(report.categories(), vec!["A", "C"]);
        assert_eq!(report.table_for("A").len(), 1);
        assert_eq!(
            report.table_for("C").lookup(dec!(15)).map(|r| r.employer),
            Some(dec!(1.00))
        );
    }

    #[test]
    fn rows_before_any_marker_use_the_parser_category() {
        let csv = format!(
            "{EPF_HEADER}\n10.01 - 20.00,3.00,3.00,6.00\nBAHAGIAN B,,,\n20.01 - 40.00,6.00,5.00,11.00\n"
        );

        let report = ContributionTableParser::new(ContributionKind::Epf, "A")
            .parse(csv.as_bytes())
            .unwrap();

        assert_eq!(report.rows[0].category, "A");
        assert_eq!(report.rows[1].category, "B");
    }

    #[test]
    fn part_marker_ignores_words_that_merely_start_with_part() {
        let cells = |first: &str| vec![first.to_string(), String::new()];

        assert_eq!(part_marker(&cells("PART E")), Some("E".to_string()));
        assert_eq!(part_marker(&cells("  part d")), Some("D".to_string()));
        assert_eq!(part_marker(&cells("Parted wages")), None);
        assert_eq!(part_marker(&cells("Part F")), None);
        assert_eq!(part_marker(&cells("10.01 - 20.00")), None);
    }

    #[test]
    fn default_categories_follow_the_scheme() {
        let csv = "Actual Monthly Wage (RM),Employer (RM),Employee (RM),Total (RM)\n0.00 - 30.00,0.05,0.05,0.10\n";

        let report = ContributionTableParser::for_kind(ContributionKind::Eis)
            .parse(csv.as_bytes())
            .unwrap();

        assert_eq!(report.categories(), vec!["EIS"]);
    }
}
