//! Client for the Meta Graph API reporting endpoints.
//!
//! Uses reqwest with the access token passed as a query parameter, the way
//! the Graph API expects it. No retries and no backoff: an upstream error is
//! surfaced once to the caller.

use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use ads_core::{Creative, Insight, ListedAd};

const INSIGHT_FIELDS: &str = "reach,impressions,cpc,spend,clicks,ctr,ad_id,ad_name,date_start,date_stop";
const AD_INSIGHT_FIELDS: &str = "reach,impressions,cpc,spend,clicks,ctr";
const AD_FIELDS: &str = "id,name,status,effective_status,created_time,updated_time";
const CREATIVE_FIELDS: &str = "creative{image_url,thumbnail_url,object_story_spec,image_hash}";
const PAGE_LIMIT: &str = "500";

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx reply; `details` is the upstream `error` object.
    #[error("Graph API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        details: Value,
    },
}

/// Inclusive reporting window, serialized as the Graph API `time_range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub since: NaiveDate,
    pub until: NaiveDate,
}

impl ReportWindow {
    /// `lookback_years` back from `today`. Feb 29 clamps to Feb 28.
    pub fn ending(today: NaiveDate, lookback_years: u32) -> Self {
        let since = today
            .checked_sub_months(Months::new(lookback_years.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN);
        Self { since, until: today }
    }

    pub fn time_range(&self) -> String {
        serde_json::json!({
            "since": self.since.format("%Y-%m-%d").to_string(),
            "until": self.until.format("%Y-%m-%d").to_string(),
        })
        .to_string()
    }
}

/// `act_123` and `123` name the same account.
pub fn normalize_account_id(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("act_") => &raw[4..],
        _ => raw,
    }
}

/// The ad platform's reporting surface.
#[async_trait]
pub trait AdPlatform: Send + Sync {
    /// Ad-level insights for the whole account.
    async fn fetch_insights(
        &self,
        token: &str,
        account_id: &str,
        window: &ReportWindow,
    ) -> Result<Vec<Insight>, MetaError>;

    /// Every ad in the account, whatever its status.
    async fn fetch_ads(&self, token: &str, account_id: &str) -> Result<Vec<ListedAd>, MetaError>;

    /// Insights for a single ad; `None` when the ad has no data in the window.
    async fn fetch_ad_insight(
        &self,
        token: &str,
        ad_id: &str,
        window: &ReportWindow,
    ) -> Result<Option<Insight>, MetaError>;

    /// The ad's creative; an ad without one deserializes with `creative: None`.
    async fn fetch_creative(&self, token: &str, ad_id: &str) -> Result<Creative, MetaError>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    base_url: String,
}

impl GraphClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MetaError> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(params)
            .query(&[("access_token", token)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let details = body.get("error").cloned().unwrap_or(Value::Null);
            let message = details
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("request to {path} failed with status {status}"));
            return Err(MetaError::Api {
                status: status.as_u16(),
                message,
                details,
            });
        }

        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl AdPlatform for GraphClient {
    async fn fetch_insights(
        &self,
        token: &str,
        account_id: &str,
        window: &ReportWindow,
    ) -> Result<Vec<Insight>, MetaError> {
        let time_range = window.time_range();
        let envelope: Envelope<Insight> = self
            .get(
                &format!("act_{account_id}/insights"),
                token,
                &[
                    ("fields", INSIGHT_FIELDS),
                    ("level", "ad"),
                    ("time_range", &time_range),
                    ("limit", PAGE_LIMIT),
                ],
            )
            .await?;
        Ok(envelope.data)
    }

    async fn fetch_ads(&self, token: &str, account_id: &str) -> Result<Vec<ListedAd>, MetaError> {
        let envelope: Envelope<ListedAd> = self
            .get(
                &format!("act_{account_id}/ads"),
                token,
                &[("fields", AD_FIELDS), ("limit", PAGE_LIMIT)],
            )
            .await?;
        Ok(envelope.data)
    }

    async fn fetch_ad_insight(
        &self,
        token: &str,
        ad_id: &str,
        window: &ReportWindow,
    ) -> Result<Option<Insight>, MetaError> {
        let time_range = window.time_range();
        let envelope: Envelope<Insight> = self
            .get(
                &format!("{ad_id}/insights"),
                token,
                &[("fields", AD_INSIGHT_FIELDS), ("time_range", &time_range)],
            )
            .await?;
        Ok(envelope.data.into_iter().next())
    }

    async fn fetch_creative(&self, token: &str, ad_id: &str) -> Result<Creative, MetaError> {
        self.get(ad_id, token, &[("fields", CREATIVE_FIELDS)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeUpstream;
    use axum::http::StatusCode;
    use serde_json::json;

    fn window() -> ReportWindow {
        ReportWindow::ending(NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(), 3)
    }

    #[test]
    fn test_account_prefix_is_stripped() {
        assert_eq!(normalize_account_id("act_123"), "123");
        assert_eq!(normalize_account_id("ACT_123"), "123");
        assert_eq!(normalize_account_id(" 123 "), "123");
        assert_eq!(normalize_account_id("actual"), "actual");
        assert_eq!(normalize_account_id("ac"), "ac");
    }

    #[test]
    fn test_report_window_time_range() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        let window = ReportWindow::ending(today, 3);

        assert_eq!(window.since, NaiveDate::from_ymd_opt(2023, 10, 15).unwrap());
        assert_eq!(
            window.time_range(),
            r#"{"since":"2023-10-15","until":"2026-10-15"}"#
        );
    }

    #[test]
    fn test_report_window_leap_day() {
        let today = NaiveDate::from_ymd_opt(2028, 2, 29).unwrap();
        let window = ReportWindow::ending(today, 1);
        assert_eq!(window.since, NaiveDate::from_ymd_opt(2027, 2, 28).unwrap());
    }

    #[tokio::test]
    async fn test_insights_request_shape() {
        let upstream = FakeUpstream::start(
            StatusCode::OK,
            json!({ "data": [{ "ad_id": "1", "ad_name": "Spring", "reach": "100", "spend": "5.5" }] }),
        )
        .await;
        let client = GraphClient::new(&format!("{}/v21.0/", upstream.base_url));

        let insights = client.fetch_insights("tok", "123", &window()).await.unwrap();

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].reach, 100);

        let req = upstream.only_request();
        assert_eq!(req.path, "/v21.0/act_123/insights");
        assert_eq!(req.param("fields"), Some(INSIGHT_FIELDS));
        assert_eq!(req.param("level"), Some("ad"));
        assert_eq!(req.param("limit"), Some("500"));
        assert_eq!(
            req.param("time_range"),
            Some(r#"{"since":"2023-10-15","until":"2026-10-15"}"#)
        );
        assert_eq!(req.param("access_token"), Some("tok"));
    }

    #[tokio::test]
    async fn test_ads_and_per_ad_requests() {
        let upstream = FakeUpstream::start(StatusCode::OK, json!({ "data": [] })).await;
        let client = GraphClient::new(&upstream.base_url);

        assert!(client.fetch_ads("tok", "123").await.unwrap().is_empty());
        assert_eq!(client.fetch_ad_insight("tok", "42", &window()).await.unwrap(), None);

        let requests = upstream.requests();
        assert_eq!(requests[0].path, "/act_123/ads");
        assert_eq!(requests[0].param("fields"), Some(AD_FIELDS));
        assert_eq!(requests[0].param("limit"), Some("500"));

        assert_eq!(requests[1].path, "/42/insights");
        assert_eq!(requests[1].param("fields"), Some(AD_INSIGHT_FIELDS));
        assert!(requests[1].param("time_range").is_some());
        assert_eq!(requests[1].param("level"), None);
    }

    #[tokio::test]
    async fn test_creative_request() {
        let upstream = FakeUpstream::start(
            StatusCode::OK,
            json!({ "id": "42", "creative": { "id": "7", "image_hash": "abc" } }),
        )
        .await;
        let client = GraphClient::new(&upstream.base_url);

        let creative = client.fetch_creative("tok", "42").await.unwrap();

        assert_eq!(
            creative.resolve_image_url().as_deref(),
            Some("https://scontent.xx.fbcdn.net/v/t45.1600-4/abc")
        );
        let req = upstream.only_request();
        assert_eq!(req.path, "/42");
        assert_eq!(req.param("fields"), Some(CREATIVE_FIELDS));
    }

    #[tokio::test]
    async fn test_upstream_error_keeps_message_and_details() {
        let upstream = FakeUpstream::start(
            StatusCode::BAD_REQUEST,
            json!({ "error": {
                "message": "Invalid OAuth access token.",
                "type": "OAuthException",
                "code": 190
            } }),
        )
        .await;
        let client = GraphClient::new(&upstream.base_url);

        let err = client.fetch_insights("bad", "123", &window()).await.unwrap_err();

        match err {
            MetaError::Api {
                status,
                message,
                details,
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid OAuth access token.");
                assert_eq!(details["type"], "OAuthException");
                assert_eq!(details["code"], 190);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_without_body_gets_generic_message() {
        let upstream = FakeUpstream::start(StatusCode::BAD_GATEWAY, Value::Null).await;
        let client = GraphClient::new(&upstream.base_url);

        let err = client.fetch_ads("tok", "123").await.unwrap_err();

        match err {
            MetaError::Api { status, message, details } => {
                assert_eq!(status, 502);
                assert!(message.contains("act_123/ads"));
                assert!(details.is_null());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_graph_envelope_tolerates_missing_data() {
        let envelope: Envelope<Insight> = serde_json::from_str(r#"{"paging":{}}"#).unwrap();
        assert!(envelope.data.is_empty());
    }
}
