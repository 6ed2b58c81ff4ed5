use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::period::{PeriodKey, SubPeriod};
use crate::region::RegionCode;
use crate::revenue::{to_minor, RawRecord};

/// One (year, sub-period, region) unit of the fiscal sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiscalCell {
    pub year: i32,
    pub sub_period: SubPeriod,
    pub region: RegionCode,
}

impl FiscalCell {
    pub fn period(&self) -> PeriodKey {
        PeriodKey::bimonthly(self.year, self.sub_period)
    }
}

impl Display for FiscalCell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} bim {} UF {} ({})",
            self.year,
            self.sub_period,
            self.region.ibge_id(),
            self.region
        )
    }
}

/// One accounting line of an RREO annex, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, rename = "no_conta_contabil")]
    pub description: Option<String>,
    #[serde(default, rename = "vl_valor")]
    pub amount: Option<f64>,
}

impl LineItem {
    pub fn new(description: impl Into<String>, amount: f64) -> Self {
        Self {
            description: Some(description.into()),
            amount: Some(amount),
        }
    }

    pub fn into_record(self, cell: &FiscalCell) -> RawRecord {
        RawRecord {
            region: cell.region,
            period: cell.period(),
            description: self.description.unwrap_or_default(),
            amount_minor: to_minor(self.amount.unwrap_or(0.0)),
        }
    }
}

/// One page of an ORDS collection response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RreoPage {
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default, rename = "hasMore")]
    pub has_more: bool,
}

#[derive(Debug, Error)]
pub enum RemoteRequestError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {preview}")]
    Status { status: u16, preview: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("pagination stalled at offset {offset}")]
    Pagination { offset: usize },
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait RevenueSource: Send + Sync {
    /// Fetches the page of `cell` that starts at `offset` items.
    async fn fetch_page(&self, cell: &FiscalCell, offset: usize) -> Result<RreoPage, RemoteRequestError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::period::SubPeriod;
    use crate::region::RegionCode;
    use crate::revenue::source::{FiscalCell, RreoPage};

    #[test]
    fn decodes_items_with_missing_or_null_fields() {
        let payload = json!({
            "items": [
                {"no_conta_contabil": "ICMS", "vl_valor": 100.5, "coluna": "x"},
                {"no_conta_contabil": "IPVA", "vl_valor": null},
                {"vl_valor": 3}
            ],
            "hasMore": true,
            "limit": 5000
        });
        let page: RreoPage = serde_json::from_value(payload).expect("decode");
        assert!(page.has_more);
        assert_eq!(page.items.len(), 3);

        let cell = FiscalCell {
            year: 2023,
            sub_period: SubPeriod::new(2).expect("valid"),
            region: RegionCode::SaoPaulo,
        };
        let records: Vec<_> = page.items.into_iter().map(|i| i.into_record(&cell)).collect();
        assert_eq!(records[0].amount_minor, 10_050);
        assert_eq!(records[1].amount_minor, 0);
        assert_eq!(records[2].description, "");
        assert_eq!(records[2].amount_minor, 300);
        assert_eq!(cell.to_string(), "2023 bim 2 UF 35 (SP)");
    }

    #[test]
    fn missing_items_decode_as_empty_page() {
        let page: RreoPage = serde_json::from_value(json!({})).expect("decode");
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }
}
