use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::revenue::source::{FiscalCell, RemoteRequestError, RevenueSource, RreoPage};

pub const DEFAULT_RREO_URL: &str = "https://apidatalake.tesouro.gov.br/ords/siconfi/tt/rreo";
/// RREO annex holding the state tax revenue lines.
pub const DEFAULT_ANNEX: u8 = 8;

const USER_AGENT: &str = concat!("uf-ledger/", env!("CARGO_PKG_VERSION"));
const BODY_PREVIEW_CHARS: usize = 180;

#[derive(Debug, Clone)]
pub struct SiconfiOptions {
    pub base_url: String,
    pub annex: u8,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for SiconfiOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RREO_URL.to_string(),
            annex: DEFAULT_ANNEX,
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(6),
        }
    }
}

/// Client for the SICONFI RREO endpoint.
pub struct SiconfiClient {
    client: Client,
    options: SiconfiOptions,
}

impl SiconfiClient {
    pub fn new(options: SiconfiOptions) -> Result<Self, RemoteRequestError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .build()?;
        Ok(Self { client, options })
    }

    fn query(&self, cell: &FiscalCell, offset: usize) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("an_exercicio", cell.year.to_string()),
            ("nr_periodo", cell.sub_period.to_string()),
            ("co_uf", cell.region.ibge_id().to_string()),
            ("nr_anexo", self.options.annex.to_string()),
        ];
        if offset > 0 {
            params.push(("offset", offset.to_string()));
        }
        params
    }
}

#[async_trait]
impl RevenueSource for SiconfiClient {
    async fn fetch_page(&self, cell: &FiscalCell, offset: usize) -> Result<RreoPage, RemoteRequestError> {
        debug!(%cell, offset, "GET {}", self.options.base_url);
        let response = self
            .client
            .get(&self.options.base_url)
            .query(&self.query(cell, offset))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
            return Err(RemoteRequestError::Status {
                status: status.as_u16(),
                preview,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::prelude::*;
    use serde_json::json;

    use crate::period::SubPeriod;
    use crate::region::RegionCode;
    use crate::revenue::http::{SiconfiClient, SiconfiOptions};
    use crate::revenue::source::{FiscalCell, RemoteRequestError, RevenueSource};

    fn cell() -> FiscalCell {
        FiscalCell {
            year: 2023,
            sub_period: SubPeriod::new(1).expect("valid"),
            region: RegionCode::SaoPaulo,
        }
    }

    fn client_for(server: &MockServer) -> SiconfiClient {
        SiconfiClient::new(SiconfiOptions {
            base_url: server.url("/rreo"),
            timeout: Duration::from_secs(2),
            ..SiconfiOptions::default()
        })
        .expect("client")
    }

    #[tokio::test]
    async fn sends_cell_parameters_and_decodes_items() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rreo")
                    .query_param("an_exercicio", "2023")
                    .query_param("nr_periodo", "1")
                    .query_param("co_uf", "35")
                    .query_param("nr_anexo", "8");
                then.status(200).json_body(json!({
                    "items": [{"no_conta_contabil": "ICMS", "vl_valor": 12.5}],
                    "hasMore": false
                }));
            })
            .await;

        let page = client_for(&server).fetch_page(&cell(), 0).await.expect("page");
        mock.assert_async().await;
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].amount, Some(12.5));
    }

    #[tokio::test]
    async fn passes_offset_for_later_pages() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/rreo").query_param("offset", "5000");
                then.status(200).json_body(json!({"items": []}));
            })
            .await;

        let page = client_for(&server).fetch_page(&cell(), 5000).await.expect("page");
        mock.assert_async().await;
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rreo");
                then.status(503).body("service unavailable");
            })
            .await;

        let err = client_for(&server)
            .fetch_page(&cell(), 0)
            .await
            .expect_err("should fail");
        assert!(matches!(err, RemoteRequestError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rreo");
                then.status(200).body("<html>maintenance</html>");
            })
            .await;

        let err = client_for(&server)
            .fetch_page(&cell(), 0)
            .await
            .expect_err("should fail");
        assert!(matches!(err, RemoteRequestError::Decode(_)));
    }
}
