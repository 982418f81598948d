//! Server configuration from environment variables.
//!
//! Secrets stay optional here: a missing credential is reported per request
//! as a configuration error (HTTP 500) rather than refusing to start.

use std::env;
use std::net::SocketAddr;

use chrono_tz::Tz;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com/v21.0";
pub const DEFAULT_SHEETS_URL: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_SHEET_NAME: &str = "Meta Ads Data";
pub const DEFAULT_TIMEZONE: &str = "America/Lima";
pub const DEFAULT_LOOKBACK_YEARS: u32 = 3;
pub const DEFAULT_ENRICH_CONCURRENCY: usize = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be used
    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: &'static str, message: String },

    /// Required variables are absent or empty
    #[error("missing configuration: {vars} must be set")]
    Missing { vars: &'static str },
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable console output (default)
    #[default]
    Console,
    /// JSON structured logging
    Json,
}

#[derive(Debug, Clone)]
pub struct MetaConfig {
    pub access_token: Option<String>,
    pub ad_account_id: Option<String>,
    pub graph_url: String,
    pub lookback_years: u32,
    pub enrich_concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: Option<String>,
    pub service_account_email: Option<String>,
    pub private_key: Option<String>,
    pub api_url: String,
    pub token_uri: String,
    pub sheet_name: String,
    pub timezone: Tz,
}

/// Everything needed to talk to one spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetCredentials {
    pub spreadsheet_id: String,
    pub service_account_email: String,
    pub private_key: String,
}

impl SheetsConfig {
    pub fn credentials(&self) -> Result<SheetCredentials, ConfigError> {
        match (
            &self.spreadsheet_id,
            &self.service_account_email,
            &self.private_key,
        ) {
            (Some(id), Some(email), Some(key)) => Ok(SheetCredentials {
                spreadsheet_id: id.clone(),
                service_account_email: email.clone(),
                private_key: key.clone(),
            }),
            _ => Err(ConfigError::Missing {
                vars: "GOOGLE_SHEETS_ID, GOOGLE_SERVICE_ACCOUNT_EMAIL and GOOGLE_PRIVATE_KEY",
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub meta: MetaConfig,
    pub sheets: SheetsConfig,
    pub log_format: LogFormat,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                var: "BIND_ADDR",
                message: e.to_string(),
            })?;

        let lookback_years = parse_or("LOOKBACK_YEARS", get("LOOKBACK_YEARS"), DEFAULT_LOOKBACK_YEARS)?;
        let enrich_concurrency = parse_or(
            "ENRICH_CONCURRENCY",
            get("ENRICH_CONCURRENCY"),
            DEFAULT_ENRICH_CONCURRENCY,
        )?;
        if enrich_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                var: "ENRICH_CONCURRENCY",
                message: "must be at least 1".to_string(),
            });
        }

        let timezone = get("SHEET_TIMEZONE")
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string())
            .parse::<Tz>()
            .map_err(|e| ConfigError::InvalidValue {
                var: "SHEET_TIMEZONE",
                message: e.to_string(),
            })?;

        let log_format = match get("LOG_FORMAT").as_deref() {
            None | Some("console") => LogFormat::Console,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "LOG_FORMAT",
                    message: format!("unknown format '{other}', expected console|json"),
                })
            }
        };

        Ok(Self {
            bind_addr,
            meta: MetaConfig {
                access_token: get("META_ACCESS_TOKEN"),
                ad_account_id: get("META_AD_ACCOUNT_ID"),
                graph_url: get("META_GRAPH_URL").unwrap_or_else(|| DEFAULT_GRAPH_URL.to_string()),
                lookback_years,
                enrich_concurrency,
            },
            sheets: SheetsConfig {
                spreadsheet_id: get("GOOGLE_SHEETS_ID"),
                service_account_email: get("GOOGLE_SERVICE_ACCOUNT_EMAIL"),
                private_key: get("GOOGLE_PRIVATE_KEY").map(|key| unescape_newlines(&key)),
                api_url: get("SHEETS_API_URL").unwrap_or_else(|| DEFAULT_SHEETS_URL.to_string()),
                token_uri: get("GOOGLE_TOKEN_URI").unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
                sheet_name: get("SHEET_NAME").unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
                timezone,
            },
            log_format,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            var,
            message: e.to_string(),
        }),
    }
}

/// PEM keys pasted into env files usually carry literal `\n` sequences.
fn unescape_newlines(key: &str) -> String {
    key.replace("\\n", "\n")
}
