pub mod normalize;
pub mod source;

use serde::{Deserialize, Serialize};

use crate::region::RegionCode;

/// One normalized population figure for a UF in a given year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationEntry {
    pub region: RegionCode,
    pub year: i32,
    pub population: u64,
}

pub use normalize::{NormalizerOptions, SpreadsheetNormalizer};
pub use source::{InMemorySheets, SheetSource, YearlyWorkbooks};
