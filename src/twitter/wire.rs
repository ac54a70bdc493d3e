//! Payload shapes returned by the Twitter/X API v2.
//!
//! These mirror the upstream JSON closely and are converted into the canonical
//! [`crate::models`] entities by the `convert` module. Every optional upstream
//! field is `Option` or defaulted so that a missing sub-structure never fails
//! decoding of the enclosing response.

use serde::Deserialize;

use crate::error::PlatformError;

/// Envelope of every API v2 response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T, M> {
    pub data: Option<T>,
    #[serde(default)]
    pub includes: Option<Includes>,
    pub meta: Option<M>,
    #[serde(default)]
    pub errors: Vec<Problem>,
}

/// Response of a paginated timeline endpoint (forward cursor only).
pub type TimelinePage<T> = ApiResponse<Vec<T>, TimelineMeta>;

/// Response of a paginated list endpoint (forward and backward cursors).
pub type Page<T> = ApiResponse<Vec<T>, PaginationMeta>;

/// Response of a lookup endpoint, which carries no pagination metadata.
pub type Lookup<T> = ApiResponse<T, NoMeta>;

impl<T, M> ApiResponse<T, M> {
    /// Returns the `data` member of a single-object response.
    ///
    /// A response without `data` is classified through its `errors` array and
    /// reported as not found when the array is empty.
    pub fn into_data(self) -> Result<(T, Option<Includes>, Option<M>), PlatformError> {
        match self.data {
            Some(data) => Ok((data, self.includes, self.meta)),
            None => Err(classify_problems(&self.errors)),
        }
    }
}

impl<T, M> ApiResponse<Vec<T>, M> {
    /// Returns the `data` member of a list response.
    ///
    /// Empty result pages omit `data`; that is only an error when the
    /// response reports problems instead.
    pub fn into_list(self) -> Result<(Vec<T>, Option<Includes>, Option<M>), PlatformError> {
        match self.data {
            Some(data) => Ok((data, self.includes, self.meta)),
            None if self.errors.is_empty() => Ok((Vec::new(), self.includes, self.meta)),
            None => Err(classify_problems(&self.errors)),
        }
    }
}

/// One entry of the upstream `errors` array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Problem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(rename = "type", default)]
    pub problem_type: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
}

impl Problem {
    pub fn summary(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| "unknown upstream problem".to_string())
    }
}

/// Problem type URIs documented for API v2.
const PROBLEM_NOT_FOUND: &str = "https://api.twitter.com/2/problems/resource-not-found";
const PROBLEM_NOT_AUTHORIZED: &str =
    "https://api.twitter.com/2/problems/not-authorized-for-resource";
const PROBLEM_UNSUPPORTED_AUTH: &str =
    "https://api.twitter.com/2/problems/unsupported-authentication";

/// Maps the first reported problem onto a [`PlatformError`] by its type and status.
pub(crate) fn classify_problems(problems: &[Problem]) -> PlatformError {
    let Some(problem) = problems.first() else {
        return PlatformError::NotFound("response contained no data".to_string());
    };
    let detail = problem.summary();
    match (problem.problem_type.as_deref(), problem.status) {
        (Some(PROBLEM_NOT_FOUND), _) | (_, Some(404)) => PlatformError::NotFound(detail),
        (Some(PROBLEM_NOT_AUTHORIZED), _)
        | (Some(PROBLEM_UNSUPPORTED_AUTH), _)
        | (_, Some(403)) => PlatformError::Forbidden(detail),
        (_, Some(401)) => PlatformError::Unauthorized(detail),
        (_, Some(429)) => PlatformError::RateLimited,
        (_, Some(status)) => PlatformError::Status { status, detail },
        (_, None) => PlatformError::Status {
            status: 200,
            detail,
        },
    }
}

/// Metadata of API responses that have none.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoMeta {}

/// Metadata shape of timeline endpoints (posts by author, mentions).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelineMeta {
    #[serde(default)]
    pub result_count: Option<usize>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// Metadata shape of cursor-symmetric list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationMeta {
    #[serde(default)]
    pub result_count: Option<usize>,
    #[serde(default)]
    pub next_token: Option<String>,
    #[serde(default)]
    pub previous_token: Option<String>,
}

/// Metadata of the post counts endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountsMeta {
    #[serde(default)]
    pub total_tweet_count: Option<u64>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// Expansions attached to a response. Only user expansions are requested.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub verified: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub public_metrics: Option<UserPublicMetrics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPublicMetrics {
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub tweet_count: u64,
    #[serde(default)]
    pub listed_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tweet {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub public_metrics: Option<TweetPublicMetrics>,
    #[serde(default)]
    pub entities: Option<TweetEntities>,
    #[serde(default)]
    pub referenced_tweets: Option<Vec<ReferencedTweet>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetPublicMetrics {
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub quote_count: u64,
    #[serde(default)]
    pub impression_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetEntities {
    #[serde(default)]
    pub hashtags: Vec<HashtagEntity>,
    #[serde(default)]
    pub mentions: Vec<MentionEntity>,
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HashtagEntity {
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MentionEntity {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlEntity {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub expanded_url: Option<String>,
    #[serde(default)]
    pub display_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferencedTweet {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountData {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub tweet_count: u64,
}
