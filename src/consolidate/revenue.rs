use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::period::PeriodKey;
use crate::region::RegionCode;
use crate::revenue::ClassifiedAggregate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One row per UF and year; sub-periods are summed away.
    Annual,
    /// One row per UF, year and bimester.
    Bimonthly,
}

/// Canonical revenue table, sorted by (year, sub-period, UF code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueTable {
    granularity: Granularity,
    rows: Vec<ClassifiedAggregate>,
}

impl RevenueTable {
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn rows(&self) -> &[ClassifiedAggregate] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ClassifiedAggregate> {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Groups aggregates by (period, UF) at the requested granularity, summing
/// every category and the total.
pub fn consolidate_revenue(
    aggregates: impl IntoIterator<Item = ClassifiedAggregate>,
    granularity: Granularity,
) -> RevenueTable {
    let mut groups: BTreeMap<(PeriodKey, RegionCode), ClassifiedAggregate> = BTreeMap::new();
    for aggregate in aggregates {
        let period = match granularity {
            Granularity::Annual => aggregate.period.to_annual(),
            Granularity::Bimonthly => aggregate.period,
        };
        let row = groups
            .entry((period, aggregate.region))
            .or_insert_with(|| ClassifiedAggregate::zero(aggregate.region, period));
        row.categories.merge(&aggregate.categories);
        row.total_minor += aggregate.total_minor;
    }
    RevenueTable {
        granularity,
        rows: groups.into_values().collect(),
    }
}
