use std::path::PathBuf;

use thiserror::Error;

use crate::period::PeriodError;
use crate::region::UnknownRegionError;

/// Failures while reading spreadsheet sources. Every variant is fatal for the
/// source it came from: there is no well-defined partial table.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("spreadsheet for {year} has {usable_columns} usable column(s), need at least two")]
    Schema { year: i32, usable_columns: usize },

    #[error("sheet '{sheet}' is missing required column '{column}'")]
    MissingColumn { sheet: String, column: String },

    #[error("{context}: value {raw:?} is not a usable number")]
    ValueFormat { context: String, raw: String },

    #[error(transparent)]
    UnknownRegion(#[from] UnknownRegionError),

    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error("failed reading workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },
}

impl IngestError {
    pub fn workbook(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Workbook {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
