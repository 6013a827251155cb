// Bulk export downloader (table.jsonl and asns.csv over HTTPS)

use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder};
use reqwest::header::USER_AGENT;

use super::parser::{parse_asn_names, parse_route_table};
use super::{AsnNames, RouteTable};
use crate::error::{AppError, AppResult};

pub const TABLE_PATH: &str = "/table.jsonl";
pub const ASN_NAMES_PATH: &str = "/asns.csv";

const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(10);
const TABLE_TIMEOUT: Duration = Duration::from_secs(120);
const ASN_NAMES_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Downloader {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl Downloader {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>) -> AppResult<Self> {
        let client = client_builder()
            .build()
            .map_err(|e| AppError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url, user_agent))
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Downloader {
            client,
            base_url: base_url.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Pre-flight probe against the ASN name export. Any non-2xx is an error.
    pub fn check_connectivity(&self) -> AppResult<u16> {
        let url = self.url(ASN_NAMES_PATH);
        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .timeout(CONNECTIVITY_TIMEOUT)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }
        Ok(status.as_u16())
    }

    /// Download and parse table.jsonl. Empty on any failure.
    pub fn download_route_table(&self) -> RouteTable {
        tracing::debug!("Downloading BGP table from {}", self.base_url);

        let text = match self.fetch_text(TABLE_PATH, TABLE_TIMEOUT) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("ERROR downloading table: {}", e);
                return RouteTable::new();
            }
        };
        tracing::debug!("Table download completed, {} characters", text.len());

        let parsed = parse_route_table(&text);
        if parsed.skipped > 0 {
            tracing::debug!("Skipped {} malformed table lines", parsed.skipped);
        }
        tracing::debug!("Parsed {} BGP table entries", parsed.parsed);
        parsed.entries
    }

    /// Download and parse asns.csv. Empty on any failure.
    pub fn download_asn_names(&self) -> AsnNames {
        tracing::debug!("Downloading ASN names from {}", self.base_url);

        let text = match self.fetch_text(ASN_NAMES_PATH, ASN_NAMES_TIMEOUT) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("ERROR downloading ASN names: {}", e);
                return AsnNames::new();
            }
        };

        let names = parse_asn_names(&text);
        tracing::debug!("Downloaded {} ASN names", names.len());
        names
    }

    fn fetch_text(&self, path: &str, timeout: Duration) -> AppResult<String> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .timeout(timeout)
            .send()?
            .error_for_status()?;

        Ok(response.text()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Connections are not pooled: every request opens its own and it is closed
/// once the response has been read.
pub fn client_builder() -> ClientBuilder {
    Client::builder().pool_max_idle_per_host(0)
}
