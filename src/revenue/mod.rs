pub mod classifier;
pub mod fetcher;
pub mod http;
pub mod pacing;
pub mod source;
pub mod wide;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::period::PeriodKey;
use crate::region::RegionCode;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaxCategory {
    Icms,
    Ipva,
    Iss,
    Itcmd,
}

impl TaxCategory {
    pub const ALL: [TaxCategory; 4] = [
        TaxCategory::Icms,
        TaxCategory::Ipva,
        TaxCategory::Iss,
        TaxCategory::Itcmd,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Icms => "ICMS",
            Self::Ipva => "IPVA",
            Self::Iss => "ISS",
            Self::Itcmd => "ITCMD",
        }
    }
}

impl Display for TaxCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Per-category amounts in centavos. Every category is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAmounts(BTreeMap<TaxCategory, i64>);

impl CategoryAmounts {
    pub fn zeroed() -> Self {
        Self(TaxCategory::ALL.iter().map(|c| (*c, 0)).collect())
    }

    pub fn get(&self, category: TaxCategory) -> i64 {
        self.0.get(&category).copied().unwrap_or(0)
    }

    pub fn add(&mut self, category: TaxCategory, amount_minor: i64) {
        *self.0.entry(category).or_insert(0) += amount_minor;
    }

    pub fn merge(&mut self, other: &CategoryAmounts) {
        for (category, amount) in other.iter() {
            self.add(category, amount);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaxCategory, i64)> + '_ {
        TaxCategory::ALL.iter().map(|c| (*c, self.get(*c)))
    }

    pub fn sum(&self) -> i64 {
        self.iter().map(|(_, amount)| amount).sum()
    }
}

impl Default for CategoryAmounts {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// One accounting line before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub region: RegionCode,
    pub period: PeriodKey,
    pub description: String,
    pub amount_minor: i64,
}

/// Revenue of one UF in one period, split into tax categories.
///
/// `total_minor` may exceed the category sum: lines that match no category
/// still count towards the total. That gap is exposed by
/// [`ClassifiedAggregate::unclassified_minor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedAggregate {
    pub region: RegionCode,
    pub period: PeriodKey,
    pub categories: CategoryAmounts,
    pub total_minor: i64,
}

impl ClassifiedAggregate {
    pub fn zero(region: RegionCode, period: PeriodKey) -> Self {
        Self {
            region,
            period,
            categories: CategoryAmounts::zeroed(),
            total_minor: 0,
        }
    }

    pub fn classified_minor(&self) -> i64 {
        self.categories.sum()
    }

    pub fn unclassified_minor(&self) -> i64 {
        self.total_minor - self.classified_minor()
    }

    pub fn is_zero(&self) -> bool {
        self.total_minor == 0 && self.categories.iter().all(|(_, amount)| amount == 0)
    }

    pub fn key(&self) -> (PeriodKey, RegionCode) {
        (self.period, self.region)
    }
}

/// Reais to centavos, rounding half away from zero.
pub fn to_minor(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Centavos as a plain decimal string with two places (`-1234.50`).
pub fn format_minor(amount_minor: i64) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use crate::period::PeriodKey;
    use crate::region::RegionCode;
    use crate::revenue::{format_minor, to_minor, CategoryAmounts, ClassifiedAggregate, TaxCategory};

    #[test]
    fn zeroed_amounts_carry_every_category() {
        let amounts = CategoryAmounts::zeroed();
        assert_eq!(amounts.iter().count(), 4);
        assert!(amounts.iter().all(|(_, v)| v == 0));
    }

    #[test]
    fn unclassified_is_total_minus_categories() {
        let mut agg = ClassifiedAggregate::zero(RegionCode::Bahia, PeriodKey::annual(2020));
        agg.categories.add(TaxCategory::Icms, 10_000);
        agg.total_minor = 10_500;
        assert_eq!(agg.classified_minor(), 10_000);
        assert_eq!(agg.unclassified_minor(), 500);
        assert!(!agg.is_zero());
    }

    #[test]
    fn minor_units_round_and_format() {
        assert_eq!(to_minor(1234.567), 123457);
        assert_eq!(to_minor(-0.004), 0);
        assert_eq!(format_minor(123457), "1234.57");
        assert_eq!(format_minor(-5), "-0.05");
        assert_eq!(format_minor(0), "0.00");
    }
}
