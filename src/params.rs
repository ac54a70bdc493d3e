//! Request parameter normalization.
//!
//! Turns loosely-typed query parameters into validated, bounded values before
//! any upstream call is made. Everything here is a pure function of its inputs
//! and the read-only configuration.

use chrono::{DateTime, Utc};

use crate::config::{GatewayConfig, CONTENT_LIST_CEILING, RELATIONSHIP_LIST_CEILING};
use crate::error::GatewayError;

/// Most identifiers forwarded in one batch lookup.
pub const BATCH_LOOKUP_LIMIT: usize = 100;

/// Ceiling class of an operation's `count` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountCeiling {
    /// Posts, likes, mentions, search, quote posts, liking and reposting accounts.
    ContentList,
    /// Followers, following, block list, mute list.
    RelationshipList,
    /// Posts by author; bounded by `MAX_TWEETS_PER_REQUEST`.
    AuthorPosts,
}

/// Default and ceilings, captured from [`GatewayConfig`] at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountPolicy {
    pub default_count: u32,
    pub max_author_posts: u32,
}

impl CountPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        CountPolicy {
            default_count: config.default_tweets_count,
            max_author_posts: config.max_tweets_per_request,
        }
    }

    pub fn ceiling(&self, class: CountCeiling) -> u32 {
        match class {
            CountCeiling::ContentList => CONTENT_LIST_CEILING,
            CountCeiling::RelationshipList => RELATIONSHIP_LIST_CEILING,
            CountCeiling::AuthorPosts => self.max_author_posts,
        }
    }

    pub fn resolve(&self, raw: Option<&str>, class: CountCeiling) -> u32 {
        resolve_count(raw, self.default_count, self.ceiling(class))
    }
}

/// Resolves a raw `count` parameter.
///
/// Empty, non-numeric, zero and negative inputs all yield `default`; values
/// above `ceiling` yield `ceiling`. `default` is returned as-is, so it must
/// already respect the ceiling (enforced when the configuration is loaded).
pub fn resolve_count(raw: Option<&str>, default: u32, ceiling: u32) -> u32 {
    let parsed = match raw.map(str::parse::<i64>) {
        Some(Ok(value)) if value > 0 => value,
        _ => return default,
    };
    if parsed > i64::from(ceiling) {
        ceiling
    } else {
        parsed as u32
    }
}

/// Splits a comma-separated identifier list.
///
/// Tokens are trimmed and empty tokens dropped; order and duplicates are kept.
/// An absent parameter is `MISSING_IDS`, one that yields no tokens is `INVALID_IDS`.
pub fn split_ids(raw: Option<&str>) -> Result<Vec<String>, GatewayError> {
    let raw = raw.ok_or_else(|| {
        GatewayError::validation("MISSING_IDS", "ids is required (comma-separated)")
    })?;

    let ids: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect();

    if ids.is_empty() {
        return Err(GatewayError::validation(
            "INVALID_IDS",
            "no valid ids were supplied",
        ));
    }
    Ok(ids)
}

/// Returns the trimmed value, or a validation error when it is absent or blank.
pub fn require<'a>(
    raw: Option<&'a str>,
    code: &'static str,
    message: &str,
) -> Result<&'a str, GatewayError> {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(GatewayError::validation(code, message)),
    }
}

/// Parses an optional RFC 3339 timestamp parameter.
pub fn parse_time(raw: Option<&str>, name: &str) -> Result<Option<DateTime<Utc>>, GatewayError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| {
                GatewayError::validation(
                    "INVALID_TIME",
                    format!("{} must be an RFC 3339 timestamp: {}", name, e),
                )
            }),
    }
}
