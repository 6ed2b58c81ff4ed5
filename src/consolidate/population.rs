use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::population::PopulationEntry;
use crate::region::RegionCode;

/// Canonical population table, sorted by (year, UF) with one row per key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationTable {
    rows: Vec<PopulationEntry>,
}

impl PopulationTable {
    pub fn rows(&self) -> &[PopulationEntry] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<PopulationEntry> {
        self.rows
    }

    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.rows.iter().map(|r| r.year).collect();
        years.dedup();
        years
    }

    /// (year, population) points for one UF, in year order.
    pub fn series(&self, region: RegionCode) -> Vec<(i32, u64)> {
        self.rows
            .iter()
            .filter(|r| r.region == region)
            .map(|r| (r.year, r.population))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationalTotal {
    pub year: i32,
    pub population: u64,
}

/// Concatenates per-year batches into the canonical table. A key seen twice
/// keeps its first value.
pub fn consolidate_population(
    batches: impl IntoIterator<Item = Vec<PopulationEntry>>,
) -> PopulationTable {
    let mut by_key: BTreeMap<(i32, RegionCode), PopulationEntry> = BTreeMap::new();
    for entry in batches.into_iter().flatten() {
        let key = (entry.year, entry.region);
        if by_key.contains_key(&key) {
            warn!(year = entry.year, region = %entry.region, "duplicate population row dropped");
            continue;
        }
        by_key.insert(key, entry);
    }
    PopulationTable {
        rows: by_key.into_values().collect(),
    }
}

/// Population of the whole country per year. A derived view; the row table
/// is left untouched.
pub fn national_totals(table: &PopulationTable) -> Vec<NationalTotal> {
    let mut totals: BTreeMap<i32, u64> = BTreeMap::new();
    for row in table.rows() {
        *totals.entry(row.year).or_insert(0) += row.population;
    }
    totals
        .into_iter()
        .map(|(year, population)| NationalTotal { year, population })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::consolidate::population::{consolidate_population, national_totals};
    use crate::population::PopulationEntry;
    use crate::region::RegionCode;

    fn entry(region: RegionCode, year: i32, population: u64) -> PopulationEntry {
        PopulationEntry {
            region,
            year,
            population,
        }
    }

    #[test]
    fn concatenates_years_and_sorts_by_year_then_code() {
        let table = consolidate_population(vec![
            vec![entry(RegionCode::SaoPaulo, 2020, 3), entry(RegionCode::Acre, 2020, 1)],
            vec![entry(RegionCode::Bahia, 2019, 2)],
        ]);
        let keys: Vec<_> = table.rows().iter().map(|r| (r.year, r.region.code())).collect();
        assert_eq!(keys, vec![(2019, "BA"), (2020, "AC"), (2020, "SP")]);
        assert_eq!(table.years(), vec![2019, 2020]);
    }

    #[test]
    fn national_total_is_a_separate_view() {
        let table = consolidate_population(vec![
            vec![entry(RegionCode::SaoPaulo, 2021, 10), entry(RegionCode::Acre, 2021, 5)],
            vec![entry(RegionCode::SaoPaulo, 2022, 11)],
        ]);
        let totals = national_totals(&table);
        assert_eq!(totals.len(), 2);
        assert_eq!((totals[0].year, totals[0].population), (2021, 15));
        assert_eq!((totals[1].year, totals[1].population), (2022, 11));
        assert_eq!(table.rows().len(), 3);
    }

    #[test]
    fn duplicate_keys_keep_the_first_value() {
        let table = consolidate_population(vec![
            vec![entry(RegionCode::Acre, 2021, 5)],
            vec![entry(RegionCode::Acre, 2021, 7)],
        ]);
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.rows()[0].population, 5);
    }

    #[test]
    fn series_follows_year_order() {
        let table = consolidate_population(vec![
            vec![entry(RegionCode::Acre, 2022, 2)],
            vec![entry(RegionCode::Acre, 2021, 1), entry(RegionCode::Bahia, 2021, 9)],
        ]);
        assert_eq!(table.series(RegionCode::Acre), vec![(2021, 1), (2022, 2)]);
        assert!(table.series(RegionCode::Goias).is_empty());
    }
}
