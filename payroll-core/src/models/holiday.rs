//! Holiday entries and Malaysian state codes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown Malaysian state '{0}'")]
pub struct UnknownStateError(pub String);

/// The 13 states and 3 federal territories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StateCode {
    Johor,
    Kedah,
    Kelantan,
    KualaLumpur,
    Labuan,
    Melaka,
    NegeriSembilan,
    Pahang,
    Perak,
    Perlis,
    PulauPinang,
    Putrajaya,
    Sabah,
    Sarawak,
    Selangor,
    Terengganu,
}

impl StateCode {
    pub const ALL: [StateCode; 16] = [
        Self::Johor,
        Self::Kedah,
        Self::Kelantan,
        Self::KualaLumpur,
        Self::Labuan,
        Self::Melaka,
        Self::NegeriSembilan,
        Self::Pahang,
        Self::Perak,
        Self::Perlis,
        Self::PulauPinang,
        Self::Putrajaya,
        Self::Sabah,
        Self::Sarawak,
        Self::Selangor,
        Self::Terengganu,
    ];

    /// Three-letter code used in compact holiday listings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Johor => "JHR",
            Self::Kedah => "KDH",
            Self::Kelantan => "KTN",
            Self::KualaLumpur => "KUL",
            Self::Labuan => "LBN",
            Self::Melaka => "MLK",
            Self::NegeriSembilan => "NSN",
            Self::Pahang => "PHG",
            Self::Perak => "PRK",
            Self::Perlis => "PLS",
            Self::PulauPinang => "PNG",
            Self::Putrajaya => "PJY",
            Self::Sabah => "SBH",
            Self::Sarawak => "SWK",
            Self::Selangor => "SGR",
            Self::Terengganu => "TRG",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Johor => "Johor",
            Self::Kedah => "Kedah",
            Self::Kelantan => "Kelantan",
            Self::KualaLumpur => "Kuala Lumpur",
            Self::Labuan => "Labuan",
            Self::Melaka => "Melaka",
            Self::NegeriSembilan => "Negeri Sembilan",
            Self::Pahang => "Pahang",
            Self::Perak => "Perak",
            Self::Perlis => "Perlis",
            Self::PulauPinang => "Pulau Pinang",
            Self::Putrajaya => "Putrajaya",
            Self::Sabah => "Sabah",
            Self::Sarawak => "Sarawak",
            Self::Selangor => "Selangor",
            Self::Terengganu => "Terengganu",
        }
    }

    /// True for labels meaning "no state filter".
    pub fn is_nationwide_label(label: &str) -> bool {
        matches!(
            label.trim().to_lowercase().as_str(),
            "" | "all" | "all malaysia" | "malaysia" | "my" | "national" | "nat"
        )
    }

    /// Parses a UI label, returning `None` for nationwide labels.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_core::StateCode;
    ///
    /// assert_eq!(StateCode::parse_label("PULAU PINANG"), Ok(Some(StateCode::PulauPinang)));
    /// assert_eq!(StateCode::parse_label("Malacca"), Ok(Some(StateCode::Melaka)));
    /// assert_eq!(StateCode::parse_label("All Malaysia"), Ok(None));
    /// ```
    pub fn parse_label(label: &str) -> Result<Option<Self>, UnknownStateError> {
        if Self::is_nationwide_label(label) {
            return Ok(None);
        }
        label.parse().map(Some)
    }
}

impl FromStr for StateCode {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_lowercase()
            .replace("wilayah persekutuan", "")
            .replace("w.p.", "")
            .trim()
            .to_string();

        let state = match normalized.as_str() {
            "johor" | "johore" | "jhr" | "my-01" => Self::Johor,
            "kedah" | "kdh" | "my-02" => Self::Kedah,
            "kelantan" | "ktn" | "my-03" => Self::Kelantan,
            "kuala lumpur" | "kl" | "k.l." | "kul" | "my-14" => Self::KualaLumpur,
            "labuan" | "lbn" | "my-15" => Self::Labuan,
            "melaka" | "malacca" | "mlk" | "my-04" => Self::Melaka,
            "negeri sembilan" | "n. sembilan" | "n.s. sembilan" | "nsn" | "my-05" => Self::NegeriSembilan,
            "pahang" | "phg" | "my-06" => Self::Pahang,
            "perak" | "prk" | "my-08" => Self::Perak,
            "perlis" | "pls" | "my-09" => Self::Perlis,
            "pulau pinang" | "penang" | "png" | "my-07" => Self::PulauPinang,
            "putrajaya" | "pjy" | "my-16" => Self::Putrajaya,
            "sabah" | "sbh" | "my-12" => Self::Sabah,
            "sarawak" | "swk" | "my-13" => Self::Sarawak,
            "selangor" | "sgr" | "my-10" => Self::Selangor,
            "terengganu" | "trg" | "my-11" => Self::Terengganu,
            _ => return Err(UnknownStateError(s.to_string())),
        };
        Ok(state)
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for StateCode {
    type Error = UnknownStateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StateCode> for String {
    fn from(state: StateCode) -> Self {
        state.as_str().to_string()
    }
}

/// Where a holiday entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayOrigin {
    /// The external holiday-data provider.
    Provider,
    /// A local admin override.
    Override,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayEntry {
    pub date: NaiveDate,
    pub name: String,
    pub origin: HolidayOrigin,
    /// Gazetted national holiday. Such provider entries are dropped when the
    /// caller excludes national holidays, even if listed for one state.
    pub is_national: bool,
    pub is_observance: bool,
    /// `None` for entries that apply nationwide.
    pub state_scope: Option<StateCode>,
}

impl HolidayEntry {
    pub fn is_nationwide(&self) -> bool {
        self.state_scope.is_none()
    }

    /// True if the entry applies to `state` (nationwide entries apply
    /// everywhere).
    pub fn applies_to(&self, state: StateCode) -> bool {
        self.state_scope.is_none_or(|scope| scope == state)
    }
}

/// Holiday entries indexed by date.
///
/// Several entries may share a date, e.g. a national holiday plus an
/// override for the same day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidaySet {
    by_date: BTreeMap<NaiveDate, Vec<HolidayEntry>>,
}

impl HolidaySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: HolidayEntry) {
        self.by_date.entry(entry.date).or_default().push(entry);
    }

    /// Removes entries on `date`. With a `scope`, only entries scoped to that
    /// state go; without one, every entry on the date goes.
    ///
    /// Returns how many entries were removed.
    pub fn remove(&mut self, date: NaiveDate, scope: Option<StateCode>) -> usize {
        let Some(entries) = self.by_date.get_mut(&date) else {
            return 0;
        };

        let before = entries.len();
        match scope {
            Some(state) => entries.retain(|e| e.state_scope != Some(state)),
            None => entries.clear(),
        }
        let removed = before - entries.len();

        if entries.is_empty() {
            self.by_date.remove(&date);
        }
        removed
    }

    pub fn entries_on(&self, date: NaiveDate) -> &[HolidayEntry] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All entries dated within `year`, in date order.
    pub fn entries_in_year(&self, year: i32) -> impl Iterator<Item = &HolidayEntry> {
        self.by_date
            .iter()
            .filter(move |(date, _)| date.year() == year)
            .flat_map(|(_, entries)| entries.iter())
    }

    pub fn iter(&self) -> impl Iterator<Item = &HolidayEntry> {
        self.by_date.values().flatten()
    }

    /// Number of distinct dates carrying at least one entry.
    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

impl FromIterator<HolidayEntry> for HolidaySet {
    fn from_iter<I: IntoIterator<Item = HolidayEntry>>(iter: I) -> Self {
        let mut set = Self::new();
        for entry in iter {
            set.insert(entry);
        }
        set
    }
}
