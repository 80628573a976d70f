use std::io::Read;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use payroll_core::{HolidayEntry, HolidayOrigin, HolidaySet, StateCode, UnknownStateError};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

static CHINESE_NEW_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)chinese new year|\bcny\b").expect("chinese new year pattern is valid")
});

static HARI_RAYA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)hari raya|\beid\b|aidil ?fitri").expect("hari raya pattern is valid")
});

static ALREADY_MULTI_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(second|2nd|third|3rd|holiday|observed|day\s*2|day\s*3)\b")
        .expect("multi-day pattern is valid")
});

/// Errors that can occur when loading holiday CSV data.
#[derive(Debug, Error)]
pub enum HolidayLoadError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("holiday '{name}' on {date}: {source}")]
    UnknownState {
        date: NaiveDate,
        name: String,
        #[source]
        source: UnknownStateError,
    },
}

impl From<csv::Error> for HolidayLoadError {
    fn from(err: csv::Error) -> Self {
        HolidayLoadError::CsvParse(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolidayKind {
    National,
    State,
    Observance,
}

/// What an override row does to the dates it names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolidayAction {
    #[default]
    Add,
    Remove,
}

/// A single row from a holiday CSV file.
///
/// Columns: `date,name,state,kind,origin,action`. `state` takes any label
/// [`StateCode`] understands; blank or "All Malaysia" means nationwide.
/// `action` may be left blank and defaults to `add`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HolidayRecord {
    pub date: NaiveDate,
    pub name: String,
    #[serde(default)]
    pub state: String,
    pub kind: HolidayKind,
    pub origin: HolidayOrigin,
    #[serde(default)]
    pub action: Option<HolidayAction>,
}

impl HolidayRecord {
    fn action(&self) -> HolidayAction {
        self.action.unwrap_or_default()
    }

    fn scope(&self) -> Result<Option<StateCode>, HolidayLoadError> {
        StateCode::parse_label(&self.state).map_err(|source| HolidayLoadError::UnknownState {
            date: self.date,
            name: self.name.clone(),
            source,
        })
    }

    fn to_entry(&self, state_scope: Option<StateCode>) -> HolidayEntry {
        HolidayEntry {
            date: self.date,
            name: self.name.clone(),
            origin: self.origin,
            is_national: self.kind == HolidayKind::National,
            is_observance: self.kind == HolidayKind::Observance,
            state_scope,
        }
    }
}

/// Loads provider and override holiday rows into a [`HolidaySet`].
pub struct HolidayCsvLoader;

impl HolidayCsvLoader {
    pub fn parse<R: Read>(reader: R) -> Result<Vec<HolidayRecord>, HolidayLoadError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: HolidayRecord = result?;
            records.push(record);
        }

        debug!(count = records.len(), "parsed holiday records");
        Ok(records)
    }

    /// Applies provider rows first, then override rows in file order, so an
    /// override can remove a provider date or add one of its own.
    ///
    /// A `remove` row with a state drops only entries scoped to that state; a
    /// nationwide `remove` clears the date.
    pub fn build_set(records: &[HolidayRecord]) -> Result<HolidaySet, HolidayLoadError> {
        let mut set = HolidaySet::new();
        let provider = records.iter().filter(|r| r.origin == HolidayOrigin::Provider);
        let overrides = records.iter().filter(|r| r.origin == HolidayOrigin::Override);

        for record in provider.chain(overrides) {
            let scope = record.scope()?;
            match record.action() {
                HolidayAction::Add => set.insert(record.to_entry(scope)),
                HolidayAction::Remove => {
                    let removed = set.remove(record.date, scope);
                    debug!(date = %record.date, name = %record.name, removed, "removed holiday entries");
                }
            }
        }

        info!(dates = set.len(), "built holiday set");
        Ok(set)
    }
}

/// Adds a "Second Day" entry after Chinese New Year and Hari Raya when the
/// source lists only the first day.
///
/// The next date is only filled if it carries no entries at all and falls in
/// the same year. Names that already read as a follow-up day ("Second Day",
/// "Holiday", "Observed", ...) are left alone. Returns the number of entries
/// added.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use payroll_core::{HolidayEntry, HolidayOrigin, HolidaySet};
/// use payroll_data::extend_multi_day_holidays;
///
/// let cny = NaiveDate::from_ymd_opt(2025, 1, 29).unwrap();
/// let mut set: HolidaySet = [HolidayEntry {
///     date: cny,
///     name: "Chinese New Year".to_string(),
///     origin: HolidayOrigin::Provider,
///     is_national: true,
///     is_observance: false,
///     state_scope: None,
/// }]
/// .into_iter()
/// .collect();
///
/// assert_eq!(extend_multi_day_holidays(&mut set), 1);
/// let next = set.entries_on(cny.succ_opt().unwrap());
/// assert_eq!(next[0].name, "Chinese New Year (Second Day)");
/// ```
pub fn extend_multi_day_holidays(set: &mut HolidaySet) -> usize {
    let candidates: Vec<HolidayEntry> = set
        .iter()
        .filter(|entry| is_multi_day_festival(&entry.name))
        .cloned()
        .collect();

    let mut added = 0;
    for entry in candidates {
        let Some(next) = entry.date.succ_opt() else {
            continue;
        };
        if next.year() != entry.date.year() || !set.entries_on(next).is_empty() {
            continue;
        }

        debug!(date = %next, name = %entry.name, "adding second day");
        set.insert(HolidayEntry {
            date: next,
            name: format!("{} (Second Day)", entry.name),
            ..entry
        });
        added += 1;
    }
    added
}

fn is_multi_day_festival(name: &str) -> bool {
    (CHINESE_NEW_YEAR.is_match(name) || HARI_RAYA.is_match(name))
        && !ALREADY_MULTI_DAY.is_match(name)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const HEADER: &str = "date,name,state,kind,origin,action";

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    fn load(rows: &str) -> HolidaySet {
        let records = HolidayCsvLoader::parse(format!("{HEADER}\n{rows}").as_bytes()).unwrap();
        HolidayCsvLoader::build_set(&records).unwrap()
    }

    // ── parsing ──────────────────────────────────────────────────────────────

    #[test]
    fn parses_row_with_blank_action() {
        let csv = format!("{HEADER}\n2025-05-01,Labour Day,All Malaysia,national,provider,");

        let records = HolidayCsvLoader::parse(csv.as_bytes()).unwrap();

        assert_eq!(
            records,
            vec![HolidayRecord {
                date: d(5, 1),
                name: "Labour Day".to_string(),
                state: "All Malaysia".to_string(),
                kind: HolidayKind::National,
                origin: HolidayOrigin::Provider,
                action: None,
            }]
        );
    }

    #[test]
    fn rejects_unknown_kind() {
        let csv = format!("{HEADER}\n2025-05-01,Labour Day,,festival,provider,");

        let err = HolidayCsvLoader::parse(csv.as_bytes()).unwrap_err();

        assert!(matches!(err, HolidayLoadError::CsvParse(_)));
    }

    #[test]
    fn unknown_state_names_the_row() {
        let csv = format!("{HEADER}\n2025-05-01,Founders Day,Atlantis,state,provider,");
        let records = HolidayCsvLoader::parse(csv.as_bytes()).unwrap();

        let err = HolidayCsvLoader::build_set(&records).unwrap_err();

        assert_eq!(
            err.to_string(),
            "holiday 'Founders Day' on 2025-05-01: unknown Malaysian state 'Atlantis'"
        );
    }

    // ── build_set ────────────────────────────────────────────────────────────

    #[test]
    fn maps_kind_and_state_onto_entries() {
        let set = load(
            "2025-12-11,Sultan of Selangor's Birthday,Selangor,state,provider,\n\
             2025-04-22,Earth Day,,observance,provider,",
        );

        let birthday = &set.entries_on(d(12, 11))[0];
        assert_eq!(birthday.state_scope, Some(StateCode::Selangor));
        assert!(!birthday.is_national);

        let earth_day = &set.entries_on(d(4, 22))[0];
        assert!(earth_day.is_observance);
        assert!(earth_day.is_nationwide());
    }

    #[test]
    fn override_remove_applies_after_provider_rows() {
        let set = load(
            "2025-06-13,Family Day,,national,override,remove\n\
             2025-06-13,Agong's Birthday,,national,provider,\n\
             2025-06-20,Family Day,,national,override,add",
        );

        assert!(set.entries_on(d(6, 13)).is_empty());
        assert_eq!(set.entries_on(d(6, 20))[0].origin, HolidayOrigin::Override);
    }

    #[test]
    fn scoped_remove_keeps_other_entries_on_the_date() {
        let set = load(
            "2025-02-11,Thaipusam,Selangor,state,provider,\n\
             2025-02-11,Thaipusam,Johor,state,provider,\n\
             2025-02-11,Thaipusam,SGR,state,override,remove",
        );

        let remaining = set.entries_on(d(2, 11));
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].state_scope, Some(StateCode::Johor));
    }

    // ── extend_multi_day_holidays ────────────────────────────────────────────

    #[test]
    fn extends_hari_raya_into_free_next_day() {
        let mut set = load("2025-03-31,Hari Raya Aidilfitri,,national,provider,");

        let added = extend_multi_day_holidays(&mut set);

        assert_eq!(added, 1);
        let second = &set.entries_on(d(4, 1))[0];
        assert_eq!(second.name, "Hari Raya Aidilfitri (Second Day)");
        assert!(second.is_national);
        assert_eq!(second.origin, HolidayOrigin::Provider);
    }

    #[test]
    fn leaves_listed_second_day_alone() {
        let mut set = load(
            "2025-01-29,Chinese New Year,,national,provider,\n\
             2025-01-30,Chinese New Year Holiday,,national,provider,",
        );

        assert_eq!(extend_multi_day_holidays(&mut set), 0);
        assert_eq!(set.entries_on(d(1, 30)).len(), 1);
    }

    #[test]
    fn one_second_day_per_festival_date() {
        let mut set = load(
            "2025-01-29,Chinese New Year,,national,provider,\n\
             2025-01-29,CNY Company Closure,,national,override,",
        );

        assert_eq!(extend_multi_day_holidays(&mut set), 1);
        assert_eq!(set.entries_on(d(1, 30)).len(), 1);
    }

    #[test]
    fn does_not_cross_into_next_year() {
        let mut set = load("2025-12-31,Hari Raya Test,,national,provider,");

        assert_eq!(extend_multi_day_holidays(&mut set), 0);
    }

    #[test]
    fn ignores_other_holidays() {
        let mut set = load("2025-10-20,Deepavali,,national,provider,");

        assert_eq!(extend_multi_day_holidays(&mut set), 0);
        assert_eq!(set.len(), 1);
    }
}
