//! Google Sheets API v4 client.
//!
//! Direct HTTP via reqwest. Authentication is the service-account JWT bearer
//! flow: an RS256 assertion signed with the account's private key is traded
//! for a short-lived access token, cached until shortly before it expires.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use ads_core::upsert::header_range;

use crate::config::SheetCredentials;

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const TOKEN_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const MISSING_RANGE_MARKER: &str = "Unable to parse range";

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid service account key: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),
    #[error("invalid Sheets URL: {0}")]
    InvalidUrl(String),
    #[error("token exchange failed: {0}")]
    TokenExchange(String),
    #[error("Sheets API error {status}: {message}")]
    Api { status: u16, message: String },
}

/// One A1 range and the rows to write there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeValues {
    pub range: String,
    pub values: Vec<Vec<Value>>,
}

/// A single spreadsheet, as far as the sync handler needs it.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Rows in `range`, or `None` when the sheet named in the range does not exist.
    async fn read_rows(&self, range: &str) -> Result<Option<Vec<Vec<Value>>>, SheetsError>;

    /// Add a sheet tab and write `headers` into its first row.
    async fn create_sheet(&self, title: &str, headers: &[&str]) -> Result<(), SheetsError>;

    /// Overwrite every range in one call.
    async fn batch_update(&self, updates: &[RangeValues]) -> Result<(), SheetsError>;

    /// Insert rows after the last row of the table found at `range`.
    async fn append(&self, range: &str, rows: &[Vec<Value>]) -> Result<(), SheetsError>;
}

/// Opens a [`SheetStore`] for a set of credentials.
///
/// Connecting performs no network I/O; the first request authenticates.
pub trait SheetConnector: Send + Sync {
    fn connect(&self, credentials: &SheetCredentials) -> Result<Box<dyn SheetStore>, SheetsError>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    account: String,
    access_token: String,
    expires_at: i64,
}

/// Connector for the real Sheets API. Access tokens are shared across
/// connections for the same service account.
#[derive(Clone)]
pub struct GoogleSheets {
    http: reqwest::Client,
    api_url: String,
    token_uri: String,
    token_cache: Arc<Mutex<Option<CachedToken>>>,
}

impl GoogleSheets {
    pub fn new(api_url: &str, token_uri: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token_uri: token_uri.to_string(),
            token_cache: Arc::new(Mutex::new(None)),
        }
    }
}

impl SheetConnector for GoogleSheets {
    fn connect(&self, credentials: &SheetCredentials) -> Result<Box<dyn SheetStore>, SheetsError> {
        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())?;
        Ok(Box::new(SheetsClient {
            http: self.http.clone(),
            api_url: self.api_url.clone(),
            spreadsheet_id: credentials.spreadsheet_id.clone(),
            auth: ServiceAccountAuth {
                email: credentials.service_account_email.clone(),
                key,
                token_uri: self.token_uri.clone(),
                cache: Arc::clone(&self.token_cache),
            },
        }))
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

struct ServiceAccountAuth {
    email: String,
    key: EncodingKey,
    token_uri: String,
    cache: Arc<Mutex<Option<CachedToken>>>,
}

impl ServiceAccountAuth {
    async fn access_token(&self, http: &reqwest::Client) -> Result<String, SheetsError> {
        let now = Utc::now().timestamp();
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if cached.account == self.email && cached.expires_at - TOKEN_REFRESH_MARGIN_SECS > now {
                return Ok(cached.access_token.clone());
            }
        }

        let claims = Claims {
            iss: &self.email,
            scope: SPREADSHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)?;

        let resp = http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SheetsError::TokenExchange(format!("{status}: {text}")));
        }

        let token: TokenResponse = resp.json().await?;
        debug!(account = %self.email, "service account token issued");

        *cache = Some(CachedToken {
            account: self.email.clone(),
            access_token: token.access_token.clone(),
            expires_at: now + token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS),
        });
        Ok(token.access_token)
    }
}

pub struct SheetsClient {
    http: reqwest::Client,
    api_url: String,
    spreadsheet_id: String,
    auth: ServiceAccountAuth,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsClient {
    /// `{api}/spreadsheets/{id}/{segments..}` with every segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = Url::parse(&self.api_url).map_err(|e| SheetsError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::InvalidUrl(self.api_url.clone()))?
            .pop_if_empty()
            .push("spreadsheets")
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, SheetsError> {
        let token = self.auth.access_token(&self.http).await?;
        let resp = request.bearer_auth(token).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let message = body["error"]["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("request failed with status {status}"));
            return Err(SheetsError::Api { status, message });
        }
        Ok(resp)
    }
}

#[async_trait]
impl SheetStore for SheetsClient {
    async fn read_rows(&self, range: &str) -> Result<Option<Vec<Vec<Value>>>, SheetsError> {
        let url = self.endpoint(&[&self.spreadsheet_id, "values", range])?;
        let request = self
            .http
            .get(url)
            .query(&[("valueRenderOption", "UNFORMATTED_VALUE")]);

        match self.send(request).await {
            Ok(resp) => {
                let body: ValueRange = resp.json().await?;
                Ok(Some(body.values))
            }
            Err(SheetsError::Api { status: 400, message }) if message.contains(MISSING_RANGE_MARKER) => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn create_sheet(&self, title: &str, headers: &[&str]) -> Result<(), SheetsError> {
        let batch = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.endpoint(&[&batch])?;
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });
        self.send(self.http.post(url).json(&body)).await?;

        let range = header_range(title);
        let url = self.endpoint(&[&self.spreadsheet_id, "values", &range])?;
        let body = json!({ "values": [headers] });
        self.send(
            self.http
                .put(url)
                .query(&[("valueInputOption", "RAW")])
                .json(&body),
        )
        .await?;

        info!(sheet = title, "sheet created");
        Ok(())
    }

    async fn batch_update(&self, updates: &[RangeValues]) -> Result<(), SheetsError> {
        let url = self.endpoint(&[&self.spreadsheet_id, "values:batchUpdate"])?;
        let body = json!({
            "valueInputOption": "RAW",
            "data": updates,
        });
        self.send(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn append(&self, range: &str, rows: &[Vec<Value>]) -> Result<(), SheetsError> {
        let target = format!("{range}:append");
        let url = self.endpoint(&[&self.spreadsheet_id, "values", &target])?;
        let body = json!({ "values": rows });
        self.send(
            self.http
                .post(url)
                .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
                .json(&body),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeUpstream;
    use axum::http::{Method, StatusCode};

    fn client(api_url: &str) -> SheetsClient {
        SheetsClient {
            http: reqwest::Client::new(),
            api_url: api_url.to_string(),
            spreadsheet_id: "sheet-1".to_string(),
            auth: ServiceAccountAuth {
                email: "bot@example.com".to_string(),
                key: EncodingKey::from_secret(b"unused"),
                token_uri: "https://oauth2.example.com/token".to_string(),
                cache: Arc::new(Mutex::new(None)),
            },
        }
    }

    /// Client against `upstream` with a token already cached, so no exchange happens.
    async fn authed_client(upstream: &FakeUpstream) -> SheetsClient {
        let client = client(&format!("{}/v4", upstream.base_url));
        *client.auth.cache.lock().await = Some(CachedToken {
            account: "bot@example.com".to_string(),
            access_token: "cached".to_string(),
            expires_at: Utc::now().timestamp() + 600,
        });
        client
    }

    #[tokio::test]
    async fn test_read_rows_returns_unformatted_values() {
        let upstream = FakeUpstream::start(
            StatusCode::OK,
            json!({ "range": "'Meta Ads Data'!A2:K3", "values": [["t", "1", "Spring"]] }),
        )
        .await;
        let client = authed_client(&upstream).await;

        let rows = client.read_rows("'Meta Ads Data'!A2:K").await.unwrap();

        assert_eq!(rows, Some(vec![vec![json!("t"), json!("1"), json!("Spring")]]));
        let req = upstream.only_request();
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.path, "/v4/spreadsheets/sheet-1/values/'Meta%20Ads%20Data'!A2:K");
        assert_eq!(req.param("valueRenderOption"), Some("UNFORMATTED_VALUE"));
        assert_eq!(req.authorization.as_deref(), Some("Bearer cached"));
    }

    #[tokio::test]
    async fn test_empty_range_reads_as_no_rows() {
        let upstream = FakeUpstream::start(StatusCode::OK, json!({ "range": "'S'!A2:K" })).await;
        let client = authed_client(&upstream).await;

        assert_eq!(client.read_rows("'S'!A2:K").await.unwrap(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_unknown_sheet_reads_as_missing() {
        let upstream = FakeUpstream::start(
            StatusCode::BAD_REQUEST,
            json!({ "error": {
                "code": 400,
                "message": "Unable to parse range: 'Meta Ads Data'!A2:K",
                "status": "INVALID_ARGUMENT"
            } }),
        )
        .await;
        let client = authed_client(&upstream).await;

        assert_eq!(client.read_rows("'Meta Ads Data'!A2:K").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_other_read_errors_propagate() {
        let upstream = FakeUpstream::start(
            StatusCode::FORBIDDEN,
            json!({ "error": { "code": 403, "message": "The caller does not have permission" } }),
        )
        .await;
        let client = authed_client(&upstream).await;

        match client.read_rows("'S'!A2:K").await {
            Err(SheetsError::Api { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "The caller does not have permission");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_append_inserts_raw_rows() {
        let upstream = FakeUpstream::start(StatusCode::OK, json!({})).await;
        let client = authed_client(&upstream).await;

        client
            .append("'S'!A2:K", &[vec![json!("t"), json!(3)]])
            .await
            .unwrap();

        let req = upstream.only_request();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.path, "/v4/spreadsheets/sheet-1/values/'S'!A2:K:append");
        assert_eq!(req.param("valueInputOption"), Some("RAW"));
        assert_eq!(req.param("insertDataOption"), Some("INSERT_ROWS"));
        assert_eq!(req.json(), json!({ "values": [["t", 3]] }));
    }

    #[tokio::test]
    async fn test_batch_update_sends_every_range() {
        let upstream = FakeUpstream::start(StatusCode::OK, json!({})).await;
        let client = authed_client(&upstream).await;

        client
            .batch_update(&[
                RangeValues {
                    range: "'S'!A2:K2".to_string(),
                    values: vec![vec![json!("a")]],
                },
                RangeValues {
                    range: "'S'!A5:K5".to_string(),
                    values: vec![vec![json!("b")]],
                },
            ])
            .await
            .unwrap();

        let req = upstream.only_request();
        assert_eq!(req.path, "/v4/spreadsheets/sheet-1/values:batchUpdate");
        let body = req.json();
        assert_eq!(body["valueInputOption"], "RAW");
        assert_eq!(body["data"][1]["range"], "'S'!A5:K5");
        assert_eq!(body["data"][1]["values"], json!([["b"]]));
    }

    #[tokio::test]
    async fn test_create_sheet_adds_tab_then_headers() {
        let upstream = FakeUpstream::start(StatusCode::OK, json!({})).await;
        let client = authed_client(&upstream).await;

        client
            .create_sheet("Meta Ads Data", &["Last Sync", "Account ID"])
            .await
            .unwrap();

        let requests = upstream.requests();
        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].path, "/v4/spreadsheets/sheet-1:batchUpdate");
        assert_eq!(
            requests[0].json()["requests"][0]["addSheet"]["properties"]["title"],
            "Meta Ads Data"
        );

        assert_eq!(requests[1].method, Method::PUT);
        assert_eq!(requests[1].path, "/v4/spreadsheets/sheet-1/values/'Meta%20Ads%20Data'!A1");
        assert_eq!(requests[1].param("valueInputOption"), Some("RAW"));
        assert_eq!(requests[1].json(), json!({ "values": [["Last Sync", "Account ID"]] }));
    }

    #[test]
    fn test_endpoint_encodes_ranges() {
        let client = client("https://sheets.googleapis.com/v4");
        let url = client
            .endpoint(&["sheet-1", "values", "'Meta Ads Data'!A2:K"])
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-1/values/'Meta%20Ads%20Data'!A2:K"
        );
    }

    #[test]
    fn test_endpoint_tolerates_trailing_slash() {
        let client = client("http://127.0.0.1:9000/v4/");
        let url = client.endpoint(&["sheet-1:batchUpdate"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/v4/spreadsheets/sheet-1:batchUpdate");
    }

    #[test]
    fn test_invalid_key_is_rejected_on_connect() {
        let connector = GoogleSheets::new("https://sheets.googleapis.com/v4", "https://oauth2.example.com/token");
        let creds = SheetCredentials {
            spreadsheet_id: "sheet-1".to_string(),
            service_account_email: "bot@example.com".to_string(),
            private_key: "not a pem".to_string(),
        };
        assert!(matches!(connector.connect(&creds), Err(SheetsError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_cached_token_is_reused_for_same_account() {
        let client = client("https://sheets.googleapis.com/v4");
        *client.auth.cache.lock().await = Some(CachedToken {
            account: "bot@example.com".to_string(),
            access_token: "cached".to_string(),
            expires_at: Utc::now().timestamp() + 600,
        });

        let token = client.auth.access_token(&client.http).await.unwrap();
        assert_eq!(token, "cached");
    }
}
