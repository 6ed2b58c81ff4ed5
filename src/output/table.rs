use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Row, Table};

use crate::consolidate::{Granularity, NationalTotal, PopulationTable, RevenueTable};
use crate::output::format_thousands;
use crate::region::RegionCode;
use crate::revenue::fetcher::CellFailure;
use crate::revenue::TaxCategory;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn amount_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Centavos in Brazilian notation (`1.234,56`).
pub fn format_brl(amount_minor: i64) -> String {
    let reais = amount_minor / 100;
    let cents = (amount_minor % 100).unsigned_abs();
    let sign = if amount_minor < 0 && reais == 0 { "-" } else { "" };
    format!("{sign}{},{cents:02}", format_thousands(reais))
}

pub fn render_population_table(table: &PopulationTable) -> String {
    let mut out = new_table();
    out.set_header(vec!["UF", "Ano", "Populacao"]);
    for row in table.rows() {
        out.add_row(Row::from(vec![
            Cell::new(row.region.code()),
            Cell::new(row.year),
            amount_cell(format_thousands(row.population as i64)),
        ]));
    }
    out.to_string()
}

pub fn render_national_totals_table(totals: &[NationalTotal]) -> String {
    let mut out = new_table();
    out.set_header(vec!["Ano", "Populacao Brasil"]);
    for total in totals {
        out.add_row(Row::from(vec![
            Cell::new(total.year),
            amount_cell(format_thousands(total.population as i64)),
        ]));
    }
    out.to_string()
}

pub fn render_revenue_table(table: &RevenueTable) -> String {
    let bimonthly = table.granularity() == Granularity::Bimonthly;
    let mut header = vec!["UF", "Ano"];
    if bimonthly {
        header.push("Bimestre");
    }
    header.extend(TaxCategory::ALL.iter().map(TaxCategory::label));
    header.extend(["Receita_Total", "Nao classificado"]);

    let mut out = new_table();
    out.set_header(header);
    for row in table.rows() {
        let mut cells = vec![Cell::new(row.region.code()), Cell::new(row.period.year)];
        if bimonthly {
            cells.push(Cell::new(
                row.period
                    .sub_period
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ));
        }
        cells.extend(
            row.categories
                .iter()
                .map(|(_, amount)| amount_cell(format_brl(amount))),
        );
        cells.push(amount_cell(format_brl(row.total_minor)));
        let unclassified = row.unclassified_minor();
        let gap = amount_cell(format_brl(unclassified));
        cells.push(if unclassified != 0 { gap.fg(Color::Yellow) } else { gap });
        out.add_row(Row::from(cells));
    }
    out.to_string()
}

pub fn render_failures_table(failures: &[CellFailure]) -> String {
    let mut out = new_table();
    out.set_header(vec!["Ano", "Bimestre", "UF", "Erro"]);
    for failure in failures {
        out.add_row(vec![
            Cell::new(failure.cell.year),
            Cell::new(failure.cell.sub_period),
            Cell::new(failure.cell.region.code()),
            Cell::new(&failure.error).fg(Color::Red),
        ]);
    }
    out.to_string()
}

pub fn render_regions_table(regions: &[RegionCode]) -> String {
    let mut out = new_table();
    out.set_header(vec!["IBGE", "UF", "Nome"]);
    for region in regions {
        out.add_row(vec![
            region.ibge_id().to_string(),
            region.code().to_string(),
            region.name().to_string(),
        ]);
    }
    out.to_string()
}
