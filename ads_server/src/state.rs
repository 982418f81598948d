use std::sync::Arc;

use crate::config::ServerConfig;
use crate::meta::{AdPlatform, GraphClient};
use crate::sheets::{GoogleSheets, SheetConnector};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub platform: Arc<dyn AdPlatform>,
    pub sheets: Arc<dyn SheetConnector>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        platform: Arc<dyn AdPlatform>,
        sheets: Arc<dyn SheetConnector>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            platform,
            sheets,
        }
    }

    /// State wired to the real Graph and Sheets APIs.
    pub fn from_config(config: ServerConfig) -> Self {
        let platform = Arc::new(GraphClient::new(&config.meta.graph_url));
        let sheets = Arc::new(GoogleSheets::new(
            &config.sheets.api_url,
            &config.sheets.token_uri,
        ));
        Self::new(config, platform, sheets)
    }
}
