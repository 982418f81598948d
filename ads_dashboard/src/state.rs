//! Dashboard view state.
//!
//! ```text
//! Unconfigured --configure--> Idle --refresh--> Loading --+--> Loaded
//!       ^                       ^                         |
//!       |                       +-------------------------+--> Error
//!       +------------------------- logout (from any state)
//! ```
//!
//! Nothing here retries or polls; every `Loading` comes from `init`,
//! `configure` followed by `refresh`, or an explicit `refresh`.

use tracing::{info, warn};

use ads_core::{AdRecord, Totals};

use crate::client::{AdsPayload, AdsSource, SyncSummary};
use crate::error::DashboardError;
use crate::session::{Credentials, SessionStore};

pub const NO_ADS_FOUND: &str =
    "No ads found. Check your Account ID and that the account has campaigns.";

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Unconfigured,
    Idle,
    Loading,
    Loaded(Vec<AdRecord>),
    Error(String),
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded(_) => "loaded",
            Self::Error(_) => "error",
        }
    }

    pub fn records(&self) -> &[AdRecord] {
        match self {
            Self::Loaded(records) => records,
            _ => &[],
        }
    }
}

pub struct Dashboard<S, A> {
    store: S,
    source: A,
    credentials: Option<Credentials>,
    view: ViewState,
    /// Shown next to the configuration form (rejected input, unreadable session).
    notice: Option<String>,
}

impl<S: SessionStore, A: AdsSource> Dashboard<S, A> {
    pub fn new(store: S, source: A) -> Self {
        Self {
            store,
            source,
            credentials: None,
            view: ViewState::Unconfigured,
            notice: None,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn totals(&self) -> Option<Totals> {
        Totals::from_records(self.view.records())
    }

    /// Restore saved credentials and load straight away when there are some.
    pub async fn init(&mut self) -> &ViewState {
        match self.store.load() {
            Ok(Some(credentials)) => {
                self.credentials = Some(credentials);
                self.view = ViewState::Idle;
                self.refresh().await;
            }
            Ok(None) => self.view = ViewState::Unconfigured,
            Err(e) => {
                warn!(error = %e, "could not restore session");
                self.notice = Some(e.to_string());
                self.view = ViewState::Unconfigured;
            }
        }
        &self.view
    }

    /// Accept and persist credentials. Blank values leave the dashboard
    /// unconfigured with a notice.
    pub fn configure(&mut self, access_token: &str, account_id: &str) -> Result<(), DashboardError> {
        let access_token = access_token.trim();
        let account_id = account_id.trim();
        if access_token.is_empty() || account_id.is_empty() {
            let err = DashboardError::MissingCredentials;
            self.notice = Some(err.to_string());
            if self.credentials.is_none() {
                self.view = ViewState::Unconfigured;
            }
            return Err(err);
        }

        let credentials = Credentials {
            access_token: access_token.to_string(),
            account_id: account_id.to_string(),
        };
        self.store.save(&credentials)?;
        self.credentials = Some(credentials);
        self.notice = None;
        self.view = ViewState::Idle;
        Ok(())
    }

    /// Move to `Loading`, handing back the credentials to fetch with.
    /// `None` when unconfigured or already loading.
    pub fn start_loading(&mut self) -> Option<Credentials> {
        if matches!(self.view, ViewState::Unconfigured | ViewState::Loading) {
            return None;
        }
        let credentials = self.credentials.clone()?;
        self.view = ViewState::Loading;
        Some(credentials)
    }

    /// Settle a `Loading` view with the fetch result. An empty batch is an
    /// error for the user, not an empty success.
    pub fn finish_loading(&mut self, result: Result<AdsPayload, DashboardError>) {
        if self.view != ViewState::Loading {
            return;
        }
        self.view = match result {
            Ok(payload) if payload.data.is_empty() => ViewState::Error(NO_ADS_FOUND.to_string()),
            Ok(payload) => {
                info!(
                    ads = payload.data.len(),
                    message = payload.message.as_deref().unwrap_or(""),
                    "ads loaded"
                );
                ViewState::Loaded(payload.data)
            }
            Err(e) => {
                warn!(error = %e, "refresh failed");
                ViewState::Error(e.to_string())
            }
        };
    }

    pub async fn refresh(&mut self) -> &ViewState {
        if let Some(credentials) = self.start_loading() {
            let result = self.source.fetch(&credentials).await;
            self.finish_loading(result);
        }
        &self.view
    }

    /// Forget the credentials. The view is reset even if the store fails.
    pub fn logout(&mut self) -> Result<(), DashboardError> {
        self.credentials = None;
        self.notice = None;
        self.view = ViewState::Unconfigured;
        self.store.clear()
    }

    /// Push the loaded ads to the spreadsheet.
    pub async fn sync(&self) -> Result<SyncSummary, DashboardError> {
        let ViewState::Loaded(records) = &self.view else {
            return Err(DashboardError::NothingToSync);
        };
        let account_id = self.credentials.as_ref().map(|c| c.account_id.as_str());
        self.source.sync(records, account_id).await
    }
}
