//! Core Twitter API utilities.
//!
//! This module contains the transport seam used by the gateway: a trait for
//! issuing authenticated GET requests, and its reqwest-backed implementation.
//! Responses are classified into typed [`PlatformError`] kinds here so that
//! callers never inspect error text.

use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use serde_json::Value;
use url::Url;

use super::wire::Problem;
use crate::config::GatewayConfig;
use crate::error::PlatformError;
use crate::oauth::build_bearer_auth_header;

/// Query parameters of one upstream request.
pub type QueryParams = Vec<(&'static str, String)>;

/// Issues requests against the Twitter/X API v2.
///
/// The gateway holds one implementation behind an `Arc` and shares it across
/// all concurrent requests, so implementations must be safe for concurrent use.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Performs `GET {base}/{endpoint}?{query}` and returns the decoded JSON body.
    async fn get_json(&self, endpoint: &str, query: &QueryParams) -> Result<Value, PlatformError>;
}

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// # Parameters
///
/// - `text`: The text to sanitize
/// - `max_len`: Maximum length in characters before truncation
pub(crate) fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    if sanitized.chars().count() > max_len {
        let truncated: String = sanitized.chars().take(max_len).collect();
        format!(
            "{}... [truncated, {} total bytes]",
            truncated,
            text.len()
        )
    } else {
        sanitized
    }
}

/// reqwest-backed [`ApiTransport`] authenticating with an app-only Bearer Token.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    auth_header: String,
}

impl HttpTransport {
    pub fn new(config: &GatewayConfig) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .user_agent(concat!("x-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        info!(
            "Twitter client initialized for {}",
            config.api_base_url.as_str()
        );
        Ok(HttpTransport {
            client,
            base_url: config.api_base_url.clone(),
            auth_header: build_bearer_auth_header(&config.bearer_token),
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn get_json(&self, endpoint: &str, query: &QueryParams) -> Result<Value, PlatformError> {
        let url = self.endpoint_url(endpoint);
        debug!("Request URL: {} query: {:?}", url, query);
        debug!("Request headers: Authorization: Bearer [REDACTED]");

        let response = self
            .client
            .get(&url)
            .query(query)
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .await?;

        let status = response.status();
        info!("Received response with status: {} for {}", status, endpoint);

        let body = response.text().await?;
        if status.is_success() {
            debug!(
                "Response summary for '{}': {} bytes received",
                endpoint,
                body.len()
            );
            return Ok(serde_json::from_str(&body)?);
        }

        error!("Request to '{}' failed - Status: {}", endpoint, status);
        debug!(
            "Error response for '{}': {}",
            endpoint,
            sanitize_for_logging(&body, 200)
        );
        Err(classify_status(status, &body))
    }
}

/// Maps a non-success HTTP status onto a [`PlatformError`].
pub(crate) fn classify_status(status: StatusCode, body: &str) -> PlatformError {
    let detail = serde_json::from_str::<Problem>(body)
        .ok()
        .filter(|p| p.detail.is_some() || p.title.is_some())
        .map(|p| p.summary())
        .unwrap_or_else(|| sanitize_for_logging(body, 200));

    match status {
        StatusCode::UNAUTHORIZED => PlatformError::Unauthorized(detail),
        StatusCode::FORBIDDEN => PlatformError::Forbidden(detail),
        StatusCode::NOT_FOUND => PlatformError::NotFound(detail),
        StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimited,
        other => PlatformError::Status {
            status: other.as_u16(),
            detail,
        },
    }
}
