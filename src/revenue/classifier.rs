use std::collections::BTreeMap;

use crate::period::PeriodKey;
use crate::region::RegionCode;
use crate::revenue::{ClassifiedAggregate, RawRecord, TaxCategory};

/// A category and the uppercase substrings that select it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    pub category: TaxCategory,
    pub keywords: &'static [&'static str],
}

impl CategoryRule {
    /// `description` must already be uppercased.
    pub fn matches(&self, description: &str) -> bool {
        self.keywords.iter().any(|kw| description.contains(kw))
    }
}

/// Evaluated top to bottom; the first matching rule takes the line. ICMS is
/// checked before ISS, so "ICMS E ISS" lands in ICMS.
pub const DEFAULT_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: TaxCategory::Icms,
        keywords: &["ICMS"],
    },
    CategoryRule {
        category: TaxCategory::Ipva,
        keywords: &["IPVA"],
    },
    CategoryRule {
        category: TaxCategory::Iss,
        keywords: &["ISS", "IMPOSTO SOBRE SERVIÇOS"],
    },
    CategoryRule {
        category: TaxCategory::Itcmd,
        keywords: &["ITCMD"],
    },
];

#[derive(Debug, Clone)]
pub struct RevenueClassifier {
    rules: Vec<CategoryRule>,
}

impl Default for RevenueClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }
}

impl RevenueClassifier {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn classify(&self, description: &str) -> Option<TaxCategory> {
        let upper = description.to_uppercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&upper))
            .map(|rule| rule.category)
    }

    /// Folds the lines of one (region, period) cell. Lines with another key
    /// are the caller's bug; use [`RevenueClassifier::classify_records`] for
    /// mixed input.
    pub fn fold_cell<'a>(
        &self,
        region: RegionCode,
        period: PeriodKey,
        records: impl IntoIterator<Item = &'a RawRecord>,
    ) -> ClassifiedAggregate {
        let mut aggregate = ClassifiedAggregate::zero(region, period);
        for record in records {
            debug_assert_eq!((record.region, record.period), (region, period));
            self.accumulate(&mut aggregate, record);
        }
        aggregate
    }

    /// Groups records by (period, region) and folds each group. Output is
    /// sorted by key.
    pub fn classify_records(
        &self,
        records: impl IntoIterator<Item = RawRecord>,
    ) -> Vec<ClassifiedAggregate> {
        let mut cells: BTreeMap<(PeriodKey, RegionCode), ClassifiedAggregate> = BTreeMap::new();
        for record in records {
            let aggregate = cells
                .entry((record.period, record.region))
                .or_insert_with(|| ClassifiedAggregate::zero(record.region, record.period));
            self.accumulate(aggregate, &record);
        }
        cells.into_values().collect()
    }

    fn accumulate(&self, aggregate: &mut ClassifiedAggregate, record: &RawRecord) {
        if let Some(category) = self.classify(&record.description) {
            aggregate.categories.add(category, record.amount_minor);
        }
        aggregate.total_minor += record.amount_minor;
    }
}
