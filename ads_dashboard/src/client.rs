//! HTTP client for the ads server.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use ads_core::AdRecord;

use crate::error::DashboardError;
use crate::session::Credentials;

pub const DEFAULT_API: &str = "http://127.0.0.1:3000";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdsPayload {
    #[serde(default)]
    pub data: Vec<AdRecord>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSummary {
    pub success: bool,
    pub message: String,
    pub details: String,
    pub spreadsheet_id: String,
    pub updated: usize,
    pub added: usize,
    pub rows_added: usize,
}

/// Where the dashboard gets its ads from and sends them to.
#[async_trait]
pub trait AdsSource: Send + Sync {
    async fn fetch(&self, credentials: &Credentials) -> Result<AdsPayload, DashboardError>;

    async fn sync(
        &self,
        records: &[AdRecord],
        account_id: Option<&str>,
    ) -> Result<SyncSummary, DashboardError>;
}

pub struct HttpAdsSource {
    http: Client,
    base_url: String,
}

impl HttpAdsSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Turn a non-success reply into [`DashboardError::Api`] carrying the
/// server's `error` text when the body has one.
fn api_error(status: u16, body: &str) -> DashboardError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| {
            let text = body.trim();
            if text.is_empty() {
                "request failed".to_string()
            } else {
                text.to_string()
            }
        });
    DashboardError::Api { status, message }
}

async fn check(response: Response) -> Result<Response, DashboardError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status.as_u16(), &body))
}

#[async_trait]
impl AdsSource for HttpAdsSource {
    async fn fetch(&self, credentials: &Credentials) -> Result<AdsPayload, DashboardError> {
        let response = self
            .http
            .get(self.url("/api/meta-ads"))
            .query(&[
                ("token", credentials.access_token.as_str()),
                ("accountId", credentials.account_id.as_str()),
            ])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn sync(
        &self,
        records: &[AdRecord],
        account_id: Option<&str>,
    ) -> Result<SyncSummary, DashboardError> {
        let response = self
            .http
            .post(self.url("/api/sync-to-sheets"))
            .json(&json!({ "adsData": records, "accountId": account_id }))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}
