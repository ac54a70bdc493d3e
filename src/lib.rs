//! # x-gateway
//!
//! A read-only HTTP gateway over the Twitter/X API v2, authenticating with an
//! app-only Bearer Token.
//!
//! ## Features
//!
//! - Account, relationship, timeline, search, lookup and count endpoints
//! - Bounded, normalized query parameters (`count`, `ids`, search queries)
//! - A uniform response envelope (`{..., meta: {result_count, next_token?, previous_token?}}`)
//! - Explicit capability-gap errors for operations that need user-context authentication
//! - Structured logging
//!
//! ## Configuration
//!
//! - `TWITTER_BEARER_TOKEN`: app-only Bearer Token (required)
//! - `SERVER_HOST` / `SERVER_PORT` (or `PORT`): bind address (defaults `0.0.0.0:8080`)
//! - `MAX_TWEETS_PER_REQUEST`, `DEFAULT_TWEETS_COUNT`: count bounds
//! - `X_API_BASE_URL`: upstream API root
//! - `LOG_LEVEL` / `RUST_LOG`: log filter
//!
//! ## API Endpoints
//!
//! See `GET /api/docs` for the full catalog, or `GET /` for it as an HTML page.

pub mod config;
pub mod docs;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod models;
pub mod oauth;
pub mod params;
pub mod routes;
pub mod service;
pub mod twitter;

// Re-export commonly used types and functions
pub use config::{log_level_from_env, ConfigError, GatewayConfig};
pub use error::{GatewayError, PlatformError};
pub use handlers::AppState;
pub use oauth::build_bearer_auth_header;
pub use routes::create_app;
pub use service::{GatewayService, PageRequest};
pub use twitter::{ApiTransport, HttpTransport};

#[cfg(test)]
mod tests;
