use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::consolidate::{Granularity, PopulationTable, RevenueTable};
use crate::revenue::{format_minor, TaxCategory};

const UTF8_BOM: &str = "\u{FEFF}";

pub fn population_to_csv(table: &PopulationTable) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["UF", "Ano", "Populacao"])?;
    for row in table.rows() {
        writer.write_record([
            row.region.code().to_string(),
            row.year.to_string(),
            row.population.to_string(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn revenue_to_csv(table: &RevenueTable) -> Result<String> {
    let bimonthly = table.granularity() == Granularity::Bimonthly;
    let mut header = vec!["UF", "Ano"];
    if bimonthly {
        header.push("Bimestre");
    }
    header.extend(TaxCategory::ALL.iter().map(TaxCategory::label));
    header.push("Receita_Total");

    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(&header)?;
    for row in table.rows() {
        let mut record = vec![row.region.code().to_string(), row.period.year.to_string()];
        if bimonthly {
            record.push(
                row.period
                    .sub_period
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
            );
        }
        record.extend(row.categories.iter().map(|(_, amount)| format_minor(amount)));
        record.push(format_minor(row.total_minor));
        writer.write_record(&record)?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

/// Writes rendered CSV prefixed with a UTF-8 BOM so spreadsheet tools pick
/// up the encoding. Parent directories are created as needed.
pub fn write_csv_file(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating output directory: {}", parent.display()))?;
    }
    fs::write(path, format!("{UTF8_BOM}{body}"))
        .with_context(|| format!("failed writing CSV: {}", path.display()))
}
