//! Configuration module for the x-gateway service.
//!
//! This module contains the configuration structure and environment variable handling
//! for the HTTP listener and the Twitter/X API integration. The configuration is built
//! once at startup and shared read-only by every request.

use log::{debug, error, info, warn};
use std::env;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Default upstream API root (Twitter/X API v2).
pub const DEFAULT_API_BASE_URL: &str = "https://api.x.com/2";

/// Ceiling applied to content lists (likes, mentions, search, quote posts, reposters).
pub const CONTENT_LIST_CEILING: u32 = 100;

/// Ceiling applied to relationship lists (followers, following, block list, mute list).
pub const RELATIONSHIP_LIST_CEILING: u32 = 1000;

/// Errors raised while loading [`GatewayConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TWITTER_BEARER_TOKEN is required")]
    MissingBearerToken,
    #[error("invalid server port '{0}'")]
    InvalidPort(String),
    #[error("invalid X_API_BASE_URL '{value}': {source}")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("DEFAULT_TWEETS_COUNT must be between 1 and {ceiling}, got {value}")]
    InvalidDefaultCount { value: u32, ceiling: u32 },
}

/// Configuration for the gateway.
///
/// Holds the app-only Bearer Token used for every upstream call, the listener
/// address, and the count defaults and ceilings used by the parameter normalizer.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// The Bearer Token for OAuth 2.0 app-only authentication
    pub bearer_token: String,
    /// Interface the HTTP listener binds to
    pub server_host: String,
    /// Port the HTTP listener binds to
    pub server_port: u16,
    /// Deployment environment name (informational)
    pub app_env: String,
    /// Ceiling for the posts-by-author operation
    pub max_tweets_per_request: u32,
    /// Count used when the caller supplies none, or an unusable one
    pub default_tweets_count: u32,
    /// Root of the upstream API
    pub api_base_url: Url,
}

impl GatewayConfig {
    /// Creates a new `GatewayConfig` by loading settings from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `TWITTER_BEARER_TOKEN`: Twitter API Bearer Token (app-only authentication)
    ///
    /// # Optional Environment Variables
    ///
    /// - `SERVER_HOST` (default `0.0.0.0`)
    /// - `SERVER_PORT` or `PORT` (default `8080`)
    /// - `APP_ENV` (default `development`)
    /// - `LOG_LEVEL` (default `info`)
    /// - `MAX_TWEETS_PER_REQUEST` (default `100`)
    /// - `DEFAULT_TWEETS_COUNT` (default `10`)
    /// - `X_API_BASE_URL` (default `https://api.x.com/2`)
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use x_gateway::GatewayConfig;
    ///
    /// std::env::set_var("TWITTER_BEARER_TOKEN", "your_bearer_token");
    /// let config = GatewayConfig::from_env().unwrap();
    /// assert_eq!(config.server_port, 8080);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading gateway configuration from environment variables");
        Self::from_lookup(|key| env::var(key).ok(), running_in_container())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F, in_container: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bearer_token = match get("TWITTER_BEARER_TOKEN") {
            Some(token) => {
                info!(
                    "Found TWITTER_BEARER_TOKEN environment variable with length: {}",
                    token.len()
                );
                debug!("Bearer token (masked): {}", mask_secret(&token));
                if token.len() < 10 {
                    warn!(
                        "Bearer token seems unusually short ({} characters)",
                        token.len()
                    );
                }
                token
            }
            None => {
                error!("Make sure TWITTER_BEARER_TOKEN environment variable is set");
                return Err(ConfigError::MissingBearerToken);
            }
        };

        let mut server_host = get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        if in_container && (server_host == "localhost" || server_host == "127.0.0.1") {
            warn!(
                "Running in a container but SERVER_HOST={}, binding 0.0.0.0 instead",
                server_host
            );
            server_host = "0.0.0.0".to_string();
        }

        let server_port = match get("SERVER_PORT").or_else(|| get("PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => 8080,
        };

        let max_tweets_per_request = int_or_default(&get, "MAX_TWEETS_PER_REQUEST", 100);
        let default_tweets_count = int_or_default(&get, "DEFAULT_TWEETS_COUNT", 10);

        let ceiling = max_tweets_per_request.min(CONTENT_LIST_CEILING);
        if default_tweets_count == 0 || default_tweets_count > ceiling {
            return Err(ConfigError::InvalidDefaultCount {
                value: default_tweets_count,
                ceiling,
            });
        }

        let base = get("X_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = Url::parse(base.trim_end_matches('/')).map_err(|source| {
            ConfigError::InvalidBaseUrl {
                value: base.clone(),
                source,
            }
        })?;

        let config = GatewayConfig {
            bearer_token,
            server_host,
            server_port,
            app_env: get("APP_ENV").unwrap_or_else(|| "development".to_string()),
            max_tweets_per_request,
            default_tweets_count,
            api_base_url,
        };

        info!(
            "Gateway configuration loaded: address={}, app_env={}",
            config.address(),
            config.app_env
        );
        Ok(config)
    }

    /// Returns the `host:port` string the listener binds to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// env_logger filter directive used when `RUST_LOG` is not set.
///
/// Read before the configuration itself, so that load-time warnings are
/// already filtered by it.
pub fn log_level_from_env() -> String {
    log_level(|key| env::var(key).ok())
}

fn log_level<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("LOG_LEVEL")
        .map(|level| level.trim().to_string())
        .filter(|level| !level.is_empty())
        .unwrap_or_else(|| "info".to_string())
}

fn int_or_default<F>(get: &F, key: &str, default: u32) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "Could not parse {}='{}' as an integer, using default {}",
                    key, raw, default
                );
                default
            }
        },
        None => default,
    }
}

/// Masks a secret for logging, keeping at most eight leading and trailing characters.
pub(crate) fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let len = chars.len();
    let prefix: String = chars.iter().take(8.min(len)).collect();
    if len > 16 {
        let suffix: String = chars[len - 8..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        format!("{}...", prefix)
    }
}

fn running_in_container() -> bool {
    env::var("CONTAINER").map(|v| v == "true").unwrap_or(false)
        || env::var("DOCKER").map(|v| v == "true").unwrap_or(false)
        || env::var("KUBERNETES_SERVICE_HOST").is_ok()
        || Path::new("/.dockerenv").is_file()
}
