use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TessError;
use crate::urls;

/// A TESS observing sector, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SectorNumber(u32);

impl SectorNumber {
    pub fn new(value: u32) -> Result<Self, TessError> {
        if value == 0 {
            return Err(TessError::InvalidArgument(
                "sector numbers start at 1".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Zero-padded to width 3, as used in file names and URLs (`5` -> `005`).
    pub fn padded(self) -> String {
        format!("{:03}", self.0)
    }
}

impl fmt::Display for SectorNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for SectorNumber {
    type Error = TessError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SectorNumber> for u32 {
    fn from(value: SectorNumber) -> Self {
        value.0
    }
}

impl FromStr for SectorNumber {
    type Err = TessError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = value
            .trim()
            .parse::<u32>()
            .map_err(|_| TessError::InvalidArgument(format!("not a sector number: {value}")))?;
        Self::new(parsed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// NASA Exoplanet Archive TOI table.
    Caltech,
    /// MIT TESS data collection (verbose column headers).
    Mit,
}

impl CatalogSource {
    pub fn as_str(self) -> &'static str {
        match self {
            CatalogSource::Caltech => "caltech",
            CatalogSource::Mit => "mit",
        }
    }

    pub fn url(self) -> &'static str {
        match self {
            CatalogSource::Caltech => urls::CALTECH_TOI_URL,
            CatalogSource::Mit => urls::MIT_TOI_URL,
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CatalogSource {
    type Err = TessError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        if urls::toi_url(&normalized).is_none() {
            return Err(TessError::UnknownCatalogSource(value.to_string()));
        }
        match normalized.as_str() {
            "caltech" => Ok(CatalogSource::Caltech),
            "mit" => Ok(CatalogSource::Mit),
            _ => Err(TessError::UnknownCatalogSource(value.to_string())),
        }
    }
}

/// Which sectors an operation covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SectorSelector {
    /// Every sector from 1 to the configured sector count.
    #[default]
    All,
    Single(SectorNumber),
    Subset(Vec<SectorNumber>),
}

impl SectorSelector {
    /// Expands the selector into the sectors to visit, in order, each once.
    pub fn sectors(&self, sector_count: u32) -> Vec<SectorNumber> {
        match self {
            SectorSelector::All => (1..=sector_count).map(SectorNumber).collect(),
            SectorSelector::Single(sector) => vec![*sector],
            SectorSelector::Subset(sectors) => {
                let mut seen = std::collections::HashSet::new();
                sectors
                    .iter()
                    .copied()
                    .filter(|sector| seen.insert(*sector))
                    .collect()
            }
        }
    }

    /// Decodes the JSON form used in config files: `true`, an integer, or a
    /// list of integers.
    pub fn from_value(value: &Value) -> Result<Self, TessError> {
        let entry: SectorsEntry = serde_json::from_value(value.clone()).map_err(|_| {
            TessError::InvalidArgument(format!(
                "sectors must be `true`, an integer, or a list of integers, got {value}"
            ))
        })?;
        match entry {
            SectorsEntry::Flag(true) => Ok(SectorSelector::All),
            SectorsEntry::Flag(false) => Err(TessError::InvalidArgument(
                "sectors set to `false` selects nothing".to_string(),
            )),
            SectorsEntry::Single(value) => Ok(SectorSelector::Single(SectorNumber::new(value)?)),
            SectorsEntry::Subset(values) if values.is_empty() => Err(TessError::InvalidArgument(
                "sectors list is empty".to_string(),
            )),
            SectorsEntry::Subset(values) => Ok(SectorSelector::Subset(
                values
                    .into_iter()
                    .map(SectorNumber::new)
                    .collect::<Result<Vec<_>, _>>()?,
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SectorsEntry {
    Flag(bool),
    Single(u32),
    Subset(Vec<u32>),
}

impl fmt::Display for SectorSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectorSelector::All => write!(f, "all"),
            SectorSelector::Single(sector) => write!(f, "{sector}"),
            SectorSelector::Subset(sectors) => {
                let joined = sectors
                    .iter()
                    .map(|sector| sector.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "{joined}")
            }
        }
    }
}

impl FromStr for SectorSelector {
    type Err = TessError;

    /// Accepts `all`, a single sector (`5`), a list (`3,4,7`) or an inclusive
    /// range (`3-7`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let invalid = || {
            TessError::InvalidArgument(format!(
                "sectors selector not understood: `{value}` (use `all`, an integer, a list like `3,4` or a range like `3-7`)"
            ))
        };

        if trimmed.eq_ignore_ascii_case("all") || trimmed.eq_ignore_ascii_case("true") {
            return Ok(SectorSelector::All);
        }
        if let Some((start, end)) = trimmed.split_once('-') {
            let start: SectorNumber = start.parse().map_err(|_| invalid())?;
            let end: SectorNumber = end.parse().map_err(|_| invalid())?;
            if end < start {
                return Err(invalid());
            }
            return Ok(SectorSelector::Subset(
                (start.get()..=end.get()).map(SectorNumber).collect(),
            ));
        }
        if trimmed.contains(',') {
            let sectors = trimmed
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(|part| part.parse::<SectorNumber>().map_err(|_| invalid()))
                .collect::<Result<Vec<_>, _>>()?;
            if sectors.is_empty() {
                return Err(invalid());
            }
            return Ok(SectorSelector::Subset(sectors));
        }
        trimmed
            .parse::<SectorNumber>()
            .map(SectorSelector::Single)
            .map_err(|_| invalid())
    }
}
