//! API error types
//!
//! Every failure leaves the service as `{ "error": ..., "details": ... }`
//! with a matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::ConfigError;
use crate::meta::MetaError;
use crate::sheets::SheetsError;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Required credentials or identifiers are not configured
    #[error("incomplete configuration")]
    Config(#[from] ConfigError),

    /// Invalid request body or parameters
    #[error("{0}")]
    BadRequest(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    /// The ad platform rejected a request
    #[error("{message}")]
    Upstream {
        status: StatusCode,
        message: String,
        details: Value,
    },

    /// Writing to the spreadsheet failed
    #[error("failed to sync with Google Sheets")]
    Sheets(#[from] SheetsError),

    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Upstream { status, .. } => *status,
            Self::Sheets(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::Config(err) => Some(Value::String(err.to_string())),
            Self::Upstream { details, .. } if !details.is_null() => Some(details.clone()),
            Self::Sheets(err) => Some(Value::String(err.to_string())),
            Self::Internal(msg) => Some(Value::String(msg.clone())),
            _ => None,
        }
    }
}

impl From<MetaError> for ApiError {
    fn from(err: MetaError) -> Self {
        match err {
            MetaError::Api {
                status,
                message,
                details,
            } => Self::Upstream {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
                details,
            },
            MetaError::Http(err) => Self::Internal(err.to_string()),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details(),
        };

        tracing::warn!(
            status = status.as_u16(),
            error_message = %body.error,
            details = ?body.details,
            "API error response"
        );

        (status, Json(body)).into_response()
    }
}
