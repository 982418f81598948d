//! HTTP routes.
//!
//! - `GET /api/meta-ads` (+ `OPTIONS`): aggregated ad records
//! - `POST /api/sync-to-sheets`: upsert records into the spreadsheet
//! - `GET /health`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use ads_core::{AdRecord, SyncContext, Totals};

use crate::aggregate::collect_ads;
use crate::config::{ConfigError, MetaConfig};
use crate::error::{ApiError, Result};
use crate::meta::ReportWindow;
use crate::state::AppState;
use crate::sync::{sync_records, sync_timestamp};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/meta-ads",
            get(meta_ads).options(options_ok).fallback(method_not_allowed),
        )
        .route(
            "/api/sync-to-sheets",
            post(sync_to_sheets).fallback(method_not_allowed),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn options_ok() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdsQuery {
    pub token: Option<String>,
    pub account_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdsResponse {
    pub data: Vec<AdRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Request values first, then the bearer header, then server configuration.
fn resolve_credentials(
    query: AdsQuery,
    headers: &HeaderMap,
    config: &MetaConfig,
) -> std::result::Result<(String, String), ConfigError> {
    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    let token = non_empty(query.token)
        .or_else(|| non_empty(bearer))
        .or_else(|| config.access_token.clone());
    let account_id = non_empty(query.account_id).or_else(|| config.ad_account_id.clone());

    match (token, account_id) {
        (Some(token), Some(account_id)) => Ok((token, account_id)),
        _ => Err(ConfigError::Missing {
            vars: "META_ACCESS_TOKEN and META_AD_ACCOUNT_ID",
        }),
    }
}

async fn meta_ads(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Option<Query<AdsQuery>>,
) -> Result<Json<AdsResponse>> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let (token, account_id) = resolve_credentials(query, &headers, &state.config.meta)?;

    let meta = &state.config.meta;
    let window = ReportWindow::ending(Utc::now().date_naive(), meta.lookback_years);
    let report = collect_ads(
        state.platform.as_ref(),
        &token,
        &account_id,
        &window,
        meta.enrich_concurrency,
    )
    .await?;

    Ok(Json(AdsResponse {
        data: report.records,
        message: Some(report.message),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    #[serde(rename = "adsData", default)]
    pub ads_data: Option<Vec<AdRecord>>,
    #[serde(rename = "accountId", default)]
    pub account_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    pub details: String,
    pub spreadsheet_id: String,
    pub updated: usize,
    pub added: usize,
    pub rows_added: usize,
}

async fn sync_to_sheets(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Json<SyncResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(format!("invalid payload: {e}")))?;
    let records = request
        .ads_data
        .ok_or_else(|| ApiError::BadRequest("invalid payload: adsData must be an array".to_string()))?;

    let sheets = &state.config.sheets;
    let credentials = sheets.credentials()?;
    let store = state.sheets.connect(&credentials)?;

    let synced_at = sync_timestamp(Utc::now(), sheets.timezone);
    let account_id = request
        .account_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let ctx = SyncContext {
        synced_at: &synced_at,
        account_id,
    };

    let outcome = sync_records(store.as_ref(), &sheets.sheet_name, &records, &ctx).await?;
    info!(
        records = records.len(),
        updated = outcome.updated,
        added = outcome.added,
        "sheet synced"
    );

    let totals = Totals::from_records(&records).unwrap_or_default();
    Ok(Json(SyncResponse {
        success: true,
        message: format!("{} ads synced", records.len()),
        details: format!("Reach: {} | Spend: ${:.2}", totals.reach, totals.spend),
        spreadsheet_id: credentials.spreadsheet_id,
        updated: outcome.updated,
        added: outcome.added,
        rows_added: outcome.updated + outcome.added,
    }))
}
