//! HTTP client for the Rama Judicial `ConsultaPublicaProcesos` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use procesal_core::Process;
use reqwest::header::ACCEPT;
use serde::Serialize;
use tracing::{info, warn};

use crate::lookup::{CaseLookup, FetchError, QueryKind, SearchQuery, parse_lookup_response};

const LOOKUP_PATH: &str = "/Procesos/ConsultaPublicaProcesos";

#[derive(Serialize)]
struct LookupRequest<'a> {
    #[serde(rename = "numeroRadicado")]
    filing_number: &'a str,
}

/// HTTP client for the public case-lookup service.
pub struct LookupClient {
    client: reqwest::Client,
    base_url: String,
}

impl LookupClient {
    /// `base_url` is like `https://host:448/api/v2`; a trailing slash is dropped.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Like [`new`](Self::new), with a per-request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}{LOOKUP_PATH}", self.base_url)
    }
}

#[async_trait]
impl CaseLookup for LookupClient {
    /// Blank values and query kinds the service has no endpoint for yield an
    /// empty result without a request.
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<Process>, FetchError> {
        if query.is_blank() {
            return Ok(Vec::new());
        }
        if query.kind != QueryKind::FilingNumber {
            warn!(kind = %query.kind, "search by this kind is not available on the lookup service");
            return Ok(Vec::new());
        }

        let url = self.endpoint();
        info!(url = %url, "querying case lookup");
        let resp = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(&LookupRequest {
                filing_number: query.value.trim(),
            })
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        let processes = parse_lookup_response(status, &body)?;
        info!(count = processes.len(), "lookup complete");
        Ok(processes)
    }
}
