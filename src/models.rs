//! Canonical entities and response bodies published by the gateway.
//!
//! Every value here is built fresh from one upstream response, serialized, and
//! dropped. Optional upstream fields stay `None` and are omitted from JSON rather
//! than being filled with zero placeholders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A platform account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<AccountMetrics>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMetrics {
    pub followers_count: u64,
    pub following_count: u64,
    pub tweet_count: u64,
    pub listed_count: u64,
}

/// A single post (tweet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PostMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Entities>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_tweets: Option<Vec<Reference>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetrics {
    pub retweet_count: u64,
    pub reply_count: u64,
    pub like_count: u64,
    pub quote_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
}

/// Structures parsed out of a post's text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashtags: Vec<Hashtag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<Mention>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hashtag {
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_url: Option<String>,
}

/// Kind of relation between two posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Reply,
    Repost,
    Quote,
}

impl ReferenceKind {
    /// Maps the upstream `referenced_tweets[].type` value.
    pub fn from_upstream(kind: &str) -> Option<Self> {
        match kind {
            "replied_to" => Some(ReferenceKind::Reply),
            "retweeted" => Some(ReferenceKind::Repost),
            "quoted" => Some(ReferenceKind::Quote),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    pub id: String,
}

/// Pagination and count metadata attached to every list-shaped result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub result_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_token: Option<String>,
}

/// Posts for an account: authored posts, mentions, or likes.
#[derive(Debug, Clone, Serialize)]
pub struct AccountPostsResponse {
    pub user: Account,
    pub tweets: Vec<Post>,
    pub meta: Meta,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowingResponse {
    pub user: Account,
    pub following: Vec<Account>,
    pub meta: Meta,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowersResponse {
    pub user: Account,
    pub followers: Vec<Account>,
    pub meta: Meta,
}

/// A flat list of posts (search, batch lookup, quote posts).
#[derive(Debug, Clone, Serialize)]
pub struct PostsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet_id: Option<String>,
    pub tweets: Vec<Post>,
    pub meta: Meta,
}

/// A flat list of accounts (search, batch lookup, liking and reposting accounts).
#[derive(Debug, Clone, Serialize)]
pub struct AccountsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet_id: Option<String>,
    pub users: Vec<Account>,
    pub meta: Meta,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetailResponse {
    pub tweet: Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Account>,
}

/// Post volume for one time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountBucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub tweet_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountsResponse {
    pub query: String,
    pub counts: Vec<CountBucket>,
    pub total_tweet_count: u64,
    pub meta: Meta,
}

/// Uniform error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
}
