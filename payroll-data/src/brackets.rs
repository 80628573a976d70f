use std::io::Read;

use payroll_core::{BracketBand, TaxBracketTable, TaxTableError};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when loading tax bracket data.
#[derive(Debug, Error)]
pub enum TaxBracketLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("no brackets found for tax year {0}")]
    NoBracketsForYear(i32),

    #[error("invalid bracket table: {0}")]
    InvalidTable(#[from] TaxTableError),
}

impl From<csv::Error> for TaxBracketLoaderError {
    fn from(err: csv::Error) -> Self {
        TaxBracketLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the tax brackets CSV file.
///
/// - `tax_year`: year of assessment (e.g., 2025)
/// - `floor`: chargeable income where the band starts
/// - `upper_bound`: inclusive end of the band (empty for the top band)
/// - `rate`: marginal rate as a decimal (e.g., 0.25 for 25%)
/// - `base_tax`: tax owed on all income up to `floor`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxBracketRecord {
    pub tax_year: i32,
    pub floor: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
    pub base_tax: Decimal,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Loader for progressive bracket schedules stored as CSV.
pub struct TaxBracketLoader;

impl TaxBracketLoader {
    /// Parse tax bracket records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TaxBracketRecord>, TaxBracketLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: TaxBracketRecord = result?;
            records.push(record);
        }

        debug!(count = records.len(), "parsed bracket records");
        Ok(records)
    }

    /// Builds the validated table for `tax_year` from parsed records.
    ///
    /// Records for other years are ignored. Records may appear in any order;
    /// they are sorted by floor before the gap and continuity checks run.
    pub fn build_table(
        records: &[TaxBracketRecord],
        tax_year: i32,
    ) -> Result<TaxBracketTable, TaxBracketLoaderError> {
        let mut bands: Vec<BracketBand> = records
            .iter()
            .filter(|r| r.tax_year == tax_year)
            .map(|r| BracketBand {
                floor: r.floor,
                upper_bound: r.upper_bound,
                rate: r.rate,
                base_tax: r.base_tax,
            })
            .collect();

        if bands.is_empty() {
            return Err(TaxBracketLoaderError::NoBracketsForYear(tax_year));
        }
        bands.sort_by(|a, b| a.floor.cmp(&b.floor));

        Ok(TaxBracketTable::from_bands(&bands)?)
    }

    /// Writes `table` back out in the same CSV layout.
    pub fn to_csv(table: &TaxBracketTable, tax_year: i32) -> Result<String, TaxBracketLoaderError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["tax_year", "floor", "upper_bound", "rate", "base_tax"])?;

        for band in table.bands() {
            writer.write_record([
                tax_year.to_string(),
                band.floor.to_string(),
                band.upper_bound.map(|b| b.to_string()).unwrap_or_default(),
                band.rate.to_string(),
                band.base_tax.to_string(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| TaxBracketLoaderError::CsvParse(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| TaxBracketLoaderError::CsvParse(e.to_string()))
    }
}
