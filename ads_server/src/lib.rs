//! Ads dashboard API
//!
//! Axum service that aggregates Meta ad insights and mirrors them into a
//! Google Sheet.
//!
//! # Endpoints
//!
//! - `GET /api/meta-ads?token=..&accountId=..` - every ad in the account
//!   with its metrics and creative image. Credentials fall back to the
//!   `Authorization: Bearer` header and then to `META_ACCESS_TOKEN` /
//!   `META_AD_ACCOUNT_ID`.
//! - `POST /api/sync-to-sheets` with `{ "adsData": [...], "accountId": ".." }` -
//!   name-keyed upsert into the configured sheet.
//! - `GET /health`
//!
//! # Usage
//!
//! ```ignore
//! let config = ServerConfig::from_env()?;
//! let app = build_router(AppState::from_config(config));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod logging;
pub mod meta;
pub mod routes;
pub mod sheets;
pub mod state;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use config::ServerConfig;
pub use error::{ApiError, Result};
pub use routes::build_router;
pub use state::AppState;
