use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use ads_server::{build_router, logging, AppState, ServerConfig};

/// Ads dashboard API server.
///
/// Environment variables:
/// - BIND_ADDR: listen address (default: 0.0.0.0:3000)
/// - META_ACCESS_TOKEN / META_AD_ACCOUNT_ID: fallback Graph API credentials
/// - GOOGLE_SHEETS_ID / GOOGLE_SERVICE_ACCOUNT_EMAIL / GOOGLE_PRIVATE_KEY: sheet sync
/// - ENRICH_CONCURRENCY: per-ad lookups in flight (default: 8)
/// - LOG_FORMAT: "console" or "json" (default: console)
#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env().context("Invalid configuration")?;
    logging::init(config.log_format);

    let addr = config.bind_addr;
    info!(
        %addr,
        graph_url = %config.meta.graph_url,
        sheet = %config.sheets.sheet_name,
        enrich_concurrency = config.meta.enrich_concurrency,
        "ads_server starting"
    );

    if config.meta.access_token.is_none() || config.meta.ad_account_id.is_none() {
        warn!("META_ACCESS_TOKEN / META_AD_ACCOUNT_ID not set; requests must carry credentials");
    }
    if config.sheets.credentials().is_err() {
        warn!("Google Sheets credentials not set; /api/sync-to-sheets will fail");
    }

    let app = build_router(AppState::from_config(config));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
