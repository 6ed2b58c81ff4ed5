use std::fmt::{Display, Formatter};

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_YEAR: i32 = 1990;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("year {year} outside supported range {min}..={max}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },
    #[error("sub-period {0} outside 1..=6")]
    SubPeriodOutOfRange(u8),
}

/// Latest accepted year: next year, so a run early in January can still ask
/// for the report year that has just opened.
pub fn max_year() -> i32 {
    Utc::now().year() + 1
}

pub fn validate_year(year: i32) -> Result<i32, PeriodError> {
    let max = max_year();
    if (MIN_YEAR..=max).contains(&year) {
        Ok(year)
    } else {
        Err(PeriodError::YearOutOfRange {
            year,
            min: MIN_YEAR,
            max,
        })
    }
}

/// Bimonthly fiscal reporting interval (`nr_periodo`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SubPeriod(u8);

impl SubPeriod {
    pub const FIRST: u8 = 1;
    pub const LAST: u8 = 6;

    pub fn new(value: u8) -> Result<Self, PeriodError> {
        if (Self::FIRST..=Self::LAST).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PeriodError::SubPeriodOutOfRange(value))
        }
    }

    pub fn all() -> Vec<SubPeriod> {
        (Self::FIRST..=Self::LAST).map(SubPeriod).collect()
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for SubPeriod {
    type Error = PeriodError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubPeriod> for u8 {
    fn from(value: SubPeriod) -> Self {
        value.0
    }
}

impl Display for SubPeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Year plus optional sub-period. Population data is always annual.
///
/// Derived ordering compares the year first, and annual keys sort before any
/// sub-period of the same year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    pub year: i32,
    pub sub_period: Option<SubPeriod>,
}

impl PeriodKey {
    pub fn annual(year: i32) -> Self {
        Self {
            year,
            sub_period: None,
        }
    }

    pub fn bimonthly(year: i32, sub_period: SubPeriod) -> Self {
        Self {
            year,
            sub_period: Some(sub_period),
        }
    }

    pub fn to_annual(self) -> Self {
        Self::annual(self.year)
    }
}

impl Display for PeriodKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.sub_period {
            Some(sub) => write!(f, "{} bim {}", self.year, sub),
            None => write!(f, "{}", self.year),
        }
    }
}
