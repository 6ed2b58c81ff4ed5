//! Pre-aggregated revenue workbook: one row per UF and year with named tax
//! columns. The sheet has no ISS column, so ISS is always zero here.

use std::path::Path;

use tracing::debug;

use crate::error::IngestError;
use crate::period::{validate_year, PeriodKey};
use crate::region::RegionCode;
use crate::revenue::{to_minor, ClassifiedAggregate, TaxCategory};
use crate::sheet::{load_sheet, RawSheet, SheetCell, EMPTY_CELL};

pub const DEFAULT_WIDE_SHEET: &str = "arrecadacao por setor ";

pub const COL_REGION: &str = "no_uf";
pub const COL_YEAR: &str = "ano";
pub const COL_ICMS: &str = "va_icms_total";
pub const COL_IPVA: &str = "va_outros_tributos_ipva";
pub const COL_ITCMD: &str = "va_outros_tributos_itcd";
pub const COL_TOTAL: &str = "va_receita_tributaria_total";

struct WideColumns {
    region: usize,
    year: usize,
    icms: usize,
    ipva: usize,
    itcmd: usize,
    total: usize,
}

impl WideColumns {
    fn locate(sheet: &RawSheet) -> Result<Self, IngestError> {
        let header: Vec<String> = sheet
            .rows
            .first()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.display().trim().to_lowercase())
                    .collect()
            })
            .unwrap_or_default();
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| IngestError::MissingColumn {
                    sheet: sheet.name.clone(),
                    column: name.to_string(),
                })
        };
        Ok(Self {
            region: find(COL_REGION)?,
            year: find(COL_YEAR)?,
            icms: find(COL_ICMS)?,
            ipva: find(COL_IPVA)?,
            itcmd: find(COL_ITCMD)?,
            total: find(COL_TOTAL)?,
        })
    }
}

/// Reads the wide sheet from a workbook file.
pub fn load_wide_revenue(path: &Path, sheet_name: &str) -> Result<Vec<ClassifiedAggregate>, IngestError> {
    let sheet = load_sheet(path, Some(sheet_name))?;
    parse_wide_sheet(&sheet)
}

/// One annual aggregate per usable row, in sheet order and not yet grouped.
/// Rows with an unknown UF or an unusable year are skipped.
pub fn parse_wide_sheet(sheet: &RawSheet) -> Result<Vec<ClassifiedAggregate>, IngestError> {
    let cols = WideColumns::locate(sheet)?;
    let mut out = Vec::new();
    for (idx, row) in sheet.rows.iter().enumerate().skip(1) {
        let cell = |col: usize| row.get(col).unwrap_or(&EMPTY_CELL);
        let label = cell(cols.region).display();
        let Ok(region) = RegionCode::resolve_label(&label) else {
            debug!(row = idx + 1, label = %label, "skipping row with unknown UF");
            continue;
        };
        let Some(year) = parse_year(cell(cols.year)) else {
            debug!(row = idx + 1, "skipping row without a usable year");
            continue;
        };

        let context = |column: &str| format!("sheet '{}' row {} column {column}", sheet.name, idx + 1);
        let mut aggregate = ClassifiedAggregate::zero(region, PeriodKey::annual(year));
        aggregate
            .categories
            .add(TaxCategory::Icms, parse_amount(cell(cols.icms), || context(COL_ICMS))?);
        aggregate
            .categories
            .add(TaxCategory::Ipva, parse_amount(cell(cols.ipva), || context(COL_IPVA))?);
        aggregate
            .categories
            .add(TaxCategory::Itcmd, parse_amount(cell(cols.itcmd), || context(COL_ITCMD))?);
        aggregate.total_minor = parse_amount(cell(cols.total), || context(COL_TOTAL))?;
        out.push(aggregate);
    }
    Ok(out)
}

fn parse_year(cell: &SheetCell) -> Option<i32> {
    let year = match cell {
        SheetCell::Number(n) if n.fract() == 0.0 => *n as i32,
        SheetCell::Text(s) => s.trim().parse::<i32>().ok()?,
        _ => return None,
    };
    validate_year(year).ok()
}

/// Blank cells count as zero, like a missing value in a column sum.
fn parse_amount(cell: &SheetCell, context: impl Fn() -> String) -> Result<i64, IngestError> {
    match cell {
        SheetCell::Empty => Ok(0),
        SheetCell::Number(n) if n.is_finite() => Ok(to_minor(*n)),
        SheetCell::Text(s) if s.trim().is_empty() => Ok(0),
        SheetCell::Text(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(to_minor)
            .ok_or_else(|| IngestError::ValueFormat {
                context: context(),
                raw: s.clone(),
            }),
        SheetCell::Number(n) => Err(IngestError::ValueFormat {
            context: context(),
            raw: n.to_string(),
        }),
    }
}
