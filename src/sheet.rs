//! In-memory worksheet model shared by the spreadsheet sources, plus the
//! calamine loader that fills it from xlsx/xls/ods files.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::IngestError;

pub static EMPTY_CELL: SheetCell = SheetCell::Empty;

#[derive(Debug, Clone, PartialEq)]
pub enum SheetCell {
    Empty,
    Text(String),
    Number(f64),
}

impl SheetCell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Cell content as written in the sheet; integral numbers lose the `.0`.
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => format!("{n}"),
        }
    }
}

impl From<&Data> for SheetCell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty | Data::Error(_) => Self::Empty,
            Data::String(s) => Self::text(s.clone()),
            Data::Float(n) => Self::Number(*n),
            Data::Int(n) => Self::Number(*n as f64),
            Data::Bool(b) => Self::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Data::DateTime(dt) => Self::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Self::text(s.clone()),
        }
    }
}

/// A rectangular-ish grid of cells. Rows may be ragged; missing trailing
/// cells read as [`SheetCell::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<SheetCell>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<SheetCell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &SheetCell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// Loads one worksheet: the named one, or the first sheet when `sheet` is
/// `None`.
///
/// calamine trims leading blank rows and columns from the used range; they
/// are padded back so row and column positions match the file.
pub fn load_sheet(path: &Path, sheet: Option<&str>) -> Result<RawSheet, IngestError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| IngestError::workbook(path, e))?;
    let sheet_names = workbook.sheet_names().to_vec();
    let name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| IngestError::workbook(path, format!("no sheet named '{wanted}'")))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| IngestError::workbook(path, "workbook contains no sheets"))?,
    };
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| IngestError::workbook(path, format!("sheet '{name}': {e}")))?;

    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<SheetCell>> = (0..start_row).map(|_| Vec::new()).collect();
    for row in range.rows() {
        let mut cells = vec![SheetCell::Empty; start_col as usize];
        cells.extend(row.iter().map(SheetCell::from));
        rows.push(cells);
    }
    Ok(RawSheet::new(name, rows))
}
