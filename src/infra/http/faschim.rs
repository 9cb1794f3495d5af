use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::config::ScraperConfig;

/// One page of the portal's search API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamPage {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub cod_errore: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub debug_message: Option<String>,
    #[serde(default)]
    pub total_records: Option<i64>,
    #[serde(default)]
    pub data: Vec<JsonValue>,
}

/// Cookie-session client for the portal. Log in once, then page through.
pub struct FaschimClient {
    http: Client,
    config: ScraperConfig,
}

impl FaschimClient {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build upstream http client")?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub async fn login(&self) -> Result<()> {
        let url = self.config.login_url();
        let response = self
            .http
            .post(&url)
            .form(&[
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("login request failed: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("login rejected by upstream: HTTP {status}");
        }
        info!(url = %url, "logged in to upstream portal");
        Ok(())
    }

    pub async fn fetch_page(&self, filter: &str, page: u32) -> Result<UpstreamPage> {
        let url = self.config.data_url();
        let page_param = page.to_string();
        let page_size_param = self.config.page_size.to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("filter", filter),
                ("page", page_param.as_str()),
                ("pageSize", page_size_param.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("data request failed: {url} page {page}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("upstream returned HTTP {status} for page {page}");
        }

        let body = response
            .json::<UpstreamPage>()
            .await
            .with_context(|| format!("failed to decode upstream page {page}"))?;
        debug!(page, items = body.data.len(), total = ?body.total_records, "fetched upstream page");
        Ok(body)
    }
}
