use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Please enter your access token and ad account ID")]
    MissingCredentials,

    /// The server answered with a non-success status.
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("session storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid session data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no ads loaded; refresh before syncing")]
    NothingToSync,
}
