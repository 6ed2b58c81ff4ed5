use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::IngestError;
use crate::population::PopulationEntry;
use crate::region::RegionCode;
use crate::sheet::{RawSheet, SheetCell, EMPTY_CELL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizerOptions {
    /// Metadata rows above the data (titles, source notes).
    pub skip_rows: usize,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self { skip_rows: 1 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpreadsheetNormalizer {
    options: NormalizerOptions,
}

impl SpreadsheetNormalizer {
    pub fn new(options: NormalizerOptions) -> Self {
        Self { options }
    }

    /// Turns one yearly population sheet into catalog-checked entries.
    ///
    /// Columns that are empty in every data row are dropped first; the first
    /// two remaining columns are read as (UF label, population). Rows whose
    /// label is not a UF code are skipped.
    pub fn normalize(&self, year: i32, sheet: &RawSheet) -> Result<Vec<PopulationEntry>, IngestError> {
        let data_rows = sheet.rows.get(self.options.skip_rows..).unwrap_or(&[]);
        let width = data_rows.iter().map(Vec::len).max().unwrap_or(0);
        let usable: Vec<usize> = (0..width)
            .filter(|col| {
                data_rows
                    .iter()
                    .any(|row| row.get(*col).is_some_and(|cell| !cell.is_empty()))
            })
            .collect();
        if usable.len() < 2 {
            return Err(IngestError::Schema {
                year,
                usable_columns: usable.len(),
            });
        }
        let (label_col, value_col) = (usable[0], usable[1]);

        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for row in data_rows {
            let label = row.get(label_col).map(SheetCell::display).unwrap_or_default();
            let Ok(region) = RegionCode::from_code(&label) else {
                debug!(year, label = %label, "skipping non-UF row");
                continue;
            };
            let raw = row.get(value_col).unwrap_or(&EMPTY_CELL);
            let population = parse_population(raw).ok_or_else(|| IngestError::ValueFormat {
                context: format!("population {year} for {region}"),
                raw: raw.display(),
            })?;
            if !seen.insert(region) {
                warn!(year, %region, "duplicate UF row in population sheet, keeping the first");
                continue;
            }
            out.push(PopulationEntry {
                region,
                year,
                population,
            });
        }
        Ok(out)
    }
}

/// Text keeps only its digits (`"12.345.678"`, `"R$ 1,000"`); numeric cells
/// must be non-negative whole numbers. `None` when nothing usable remains.
pub fn parse_population(cell: &SheetCell) -> Option<u64> {
    match cell {
        SheetCell::Empty => None,
        SheetCell::Number(n) => {
            if n.is_finite() && *n >= 0.0 && n.fract() == 0.0 && *n < u64::MAX as f64 {
                Some(*n as u64)
            } else {
                None
            }
        }
        SheetCell::Text(text) => {
            let digits: String = text.chars().filter(char::is_ascii_digit).collect();
            if digits.is_empty() {
                return None;
            }
            digits.parse::<u64>().ok()
        }
    }
}
