use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::IngestError;
use crate::sheet::{load_sheet, RawSheet};

/// Where yearly population sheets come from.
pub trait SheetSource {
    fn load(&self, year: i32) -> Result<RawSheet, IngestError>;
}

/// One workbook per year under a data directory, named by a pattern with a
/// `{year}` placeholder, e.g. `populacao_uf_{year}.xlsx`.
#[derive(Debug, Clone)]
pub struct YearlyWorkbooks {
    data_dir: PathBuf,
    file_pattern: String,
}

impl YearlyWorkbooks {
    pub fn new(data_dir: impl Into<PathBuf>, file_pattern: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            file_pattern: file_pattern.into(),
        }
    }

    pub fn path_for(&self, year: i32) -> PathBuf {
        self.data_dir
            .join(self.file_pattern.replace("{year}", &year.to_string()))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl SheetSource for YearlyWorkbooks {
    fn load(&self, year: i32) -> Result<RawSheet, IngestError> {
        load_sheet(&self.path_for(year), None)
    }
}

/// Sheets held in memory, keyed by year.
#[derive(Debug, Clone, Default)]
pub struct InMemorySheets {
    sheets: BTreeMap<i32, RawSheet>,
}

impl InMemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, year: i32, sheet: RawSheet) -> Self {
        self.sheets.insert(year, sheet);
        self
    }
}

impl SheetSource for InMemorySheets {
    fn load(&self, year: i32) -> Result<RawSheet, IngestError> {
        self.sheets
            .get(&year)
            .cloned()
            .ok_or_else(|| IngestError::workbook(format!("<memory:{year}>"), "no sheet for year"))
    }
}
