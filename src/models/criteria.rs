//! Filter selections and view options chosen by the user.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Inclusive year bounds; `None` leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

impl DateRange {
    pub fn contains(&self, year: i32) -> bool {
        self.start.is_none_or(|start| year >= start) && self.end.is_none_or(|end| year <= end)
    }
}

/// Named date-range facet options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateRangeKey {
    #[serde(rename = "before-1800")]
    Before1800,
    #[serde(rename = "1800-1900")]
    From1800To1900,
    #[serde(rename = "1900-1950")]
    From1900To1950,
    #[serde(rename = "1950-2000")]
    From1950To2000,
    #[serde(rename = "after-2000")]
    After2000,
}

impl DateRangeKey {
    pub const ALL: [DateRangeKey; 5] = [
        DateRangeKey::Before1800,
        DateRangeKey::From1800To1900,
        DateRangeKey::From1900To1950,
        DateRangeKey::From1950To2000,
        DateRangeKey::After2000,
    ];

    pub fn range(self) -> DateRange {
        let (start, end) = match self {
            DateRangeKey::Before1800 => (None, Some(1799)),
            DateRangeKey::From1800To1900 => (Some(1800), Some(1900)),
            DateRangeKey::From1900To1950 => (Some(1900), Some(1950)),
            DateRangeKey::From1950To2000 => (Some(1950), Some(2000)),
            DateRangeKey::After2000 => (Some(2001), None),
        };
        DateRange { start, end }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DateRangeKey::Before1800 => "before-1800",
            DateRangeKey::From1800To1900 => "1800-1900",
            DateRangeKey::From1900To1950 => "1900-1950",
            DateRangeKey::From1950To2000 => "1950-2000",
            DateRangeKey::After2000 => "after-2000",
        }
    }
}

impl fmt::Display for DateRangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateRangeKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateRangeKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("unknown date range '{s}'")))
    }
}

/// Active search term and facet selections.
///
/// An empty term or empty set disables that stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub search_term: String,
    pub types: BTreeSet<String>,
    pub institutions: BTreeSet<String>,
    pub date_range: Option<DateRangeKey>,
}

impl FilterCriteria {
    /// True when no stage is active.
    pub fn is_empty(&self) -> bool {
        self.search_term.trim().is_empty()
            && self.types.is_empty()
            && self.institutions.is_empty()
            && self.date_range.is_none()
    }
}

/// Rendering layout for a page of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    List,
    #[default]
    Tile,
    CompactImage,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::List => "list",
            ViewMode::Tile => "tile",
            ViewMode::CompactImage => "compact-image",
        }
    }

    /// Description length shown by this layout, if it truncates at all.
    pub fn description_limit(self) -> Option<usize> {
        match self {
            ViewMode::List => Some(200),
            ViewMode::CompactImage => Some(150),
            ViewMode::Tile => None,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(ViewMode::List),
            "tile" => Ok(ViewMode::Tile),
            "compact-image" => Ok(ViewMode::CompactImage),
            other => Err(AppError::validation(format!("unknown view '{other}'"))),
        }
    }
}
