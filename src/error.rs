//! Error types for the gateway.
//!
//! [`PlatformError`] classifies failures of the upstream Twitter/X API at the
//! transport layer. [`GatewayError`] is the taxonomy surfaced at the HTTP
//! boundary; every failure becomes exactly one `{error, message, code}` response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::oauth::USER_CONTEXT_TIER;

/// Failure of a single upstream API call.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unauthorized (401): {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited (429)")]
    RateLimited,
    #[error("upstream returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("could not decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl PlatformError {
    /// True when the credential lacks permission for the resource.
    pub fn is_permission(&self) -> bool {
        matches!(
            self,
            PlatformError::Unauthorized(_) | PlatformError::Forbidden(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound(_))
    }
}

/// Error returned by a gateway operation.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A required parameter is missing or unusable.
    #[error("{message}")]
    Validation {
        code: &'static str,
        message: String,
    },
    /// The handle could not be resolved to an account id.
    #[error("could not resolve account @{handle}: {source}")]
    Resolution {
        handle: String,
        #[source]
        source: PlatformError,
    },
    /// The primary upstream call failed.
    #[error("failed to fetch {operation}: {source}")]
    Fetch {
        operation: &'static str,
        #[source]
        source: PlatformError,
    },
    /// An upstream search call failed.
    #[error("failed to search {operation}: {source}")]
    Search {
        operation: &'static str,
        #[source]
        source: PlatformError,
    },
    /// The operation cannot be served with an app-only Bearer Token.
    #[error("{operation} requires {} authentication and is not supported with an app-only Bearer Token", USER_CONTEXT_TIER)]
    Unsupported { operation: &'static str },
}

impl GatewayError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        GatewayError::Validation {
            code,
            message: message.into(),
        }
    }

    /// Short machine-readable code carried in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Validation { code, .. } => code,
            GatewayError::Resolution { .. } | GatewayError::Fetch { .. } => "FETCH_ERROR",
            GatewayError::Search { .. } => "SEARCH_ERROR",
            GatewayError::Unsupported { .. } => "UNSUPPORTED_OPERATION",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The upstream failure behind this error, if any.
    pub fn platform_error(&self) -> Option<&PlatformError> {
        match self {
            GatewayError::Resolution { source, .. }
            | GatewayError::Fetch { source, .. }
            | GatewayError::Search { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
