use rust_decimal::Decimal;
use thiserror::Error;

/// Error returned when a cell cannot be read as a ringgit amount.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid amount '{input}'")]
pub struct ParseAmountError {
    pub input: String,
}

/// Trims the cell, drops an `RM` prefix and thousands separators.
fn normalize_amount(s: &str) -> String {
    let trimmed = s.trim();
    let without_currency = trimmed
        .strip_prefix("RM")
        .or_else(|| trimmed.strip_prefix("rm"))
        .unwrap_or(trimmed);
    without_currency.trim().replace(',', "")
}

/// Parses a ringgit amount as printed in published schedules.
///
/// Accepts `"1,234.50"` and `"RM 1,234.50"`. Blank cells, `"-"` and `"NIL"`
/// mean zero.
pub fn parse_amount(s: &str) -> Result<Decimal, ParseAmountError> {
    let normalized = normalize_amount(s);
    if normalized.is_empty() || normalized == "-" || normalized.eq_ignore_ascii_case("nil") {
        return Ok(Decimal::ZERO);
    }
    normalized.parse().map_err(|_| ParseAmountError {
        input: s.to_string(),
    })
}
