//! # Tests Module
//!
//! Integration tests for the gateway's HTTP surface. Requests go through the
//! full router and middleware stack via `tower::ServiceExt::oneshot`, with the
//! upstream API replaced by [`RecordingTransport`], which replays canned JSON
//! and records every call so tests can assert on what reached the platform.

use crate::{
    config::GatewayConfig,
    error::PlatformError,
    handlers::AppState,
    routes::{create_app, with_middleware, with_middleware_and_timeout},
    service::GatewayService,
    twitter::{ApiTransport, QueryParams},
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

/// Test double for the upstream API.
///
/// Endpoints without a canned response fail with `PlatformError::NotFound`.
#[derive(Default)]
struct RecordingTransport {
    responses: HashMap<String, Value>,
    failures: HashMap<String, u16>,
    calls: Mutex<Vec<(String, QueryParams)>>,
}

impl RecordingTransport {
    fn new() -> Self {
        Self::default()
    }

    fn with(mut self, endpoint: &str, body: Value) -> Self {
        self.responses.insert(endpoint.to_string(), body);
        self
    }

    fn failing(mut self, endpoint: &str, status: u16) -> Self {
        self.failures.insert(endpoint.to_string(), status);
        self
    }

    fn calls(&self) -> Vec<(String, QueryParams)> {
        self.calls.lock().unwrap().clone()
    }

    fn endpoints(&self) -> Vec<String> {
        self.calls().into_iter().map(|(endpoint, _)| endpoint).collect()
    }

    /// Query value sent on the `n`th call.
    fn param(&self, n: usize, name: &str) -> Option<String> {
        self.calls()
            .get(n)?
            .1
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.clone())
    }
}

#[async_trait]
impl ApiTransport for RecordingTransport {
    async fn get_json(&self, endpoint: &str, query: &QueryParams) -> Result<Value, PlatformError> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), query.clone()));

        if let Some(status) = self.failures.get(endpoint) {
            let detail = format!("canned failure for {}", endpoint);
            return Err(match status {
                401 => PlatformError::Unauthorized(detail),
                403 => PlatformError::Forbidden(detail),
                404 => PlatformError::NotFound(detail),
                429 => PlatformError::RateLimited,
                other => PlatformError::Status {
                    status: *other,
                    detail,
                },
            });
        }
        self.responses
            .get(endpoint)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("no canned response for {}", endpoint)))
    }
}

/// Configuration with a post ceiling of 50.
fn test_config() -> GatewayConfig {
    GatewayConfig::from_lookup(
        |key| match key {
            "TWITTER_BEARER_TOKEN" => Some("test-bearer-token".to_string()),
            "MAX_TWEETS_PER_REQUEST" => Some("50".to_string()),
            _ => None,
        },
        false,
    )
    .unwrap()
}

/// Creates a test application backed by the given transport.
fn create_test_app(transport: Arc<RecordingTransport>) -> Router {
    let service = GatewayService::new(transport, &test_config());
    create_app(AppState::new(service))
}

async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .method(method)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json_response: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json_response)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri).await
}

fn elonmusk() -> Value {
    json!({
        "data": {
            "id": "44196397",
            "username": "elonmusk",
            "name": "Elon Musk",
            "verified": true,
            "created_at": "2009-06-02T20:12:29.000Z",
            "public_metrics": {
                "followers_count": 180000000u64,
                "following_count": 500,
                "tweet_count": 40000,
                "listed_count": 150000
            }
        }
    })
}

fn user(id: &str, username: &str) -> Value {
    json!({"id": id, "username": username, "name": username.to_uppercase()})
}

fn tweet(id: &str, author_id: &str) -> Value {
    json!({"id": id, "text": format!("post {}", id), "author_id": author_id})
}

fn with_user_lookup() -> RecordingTransport {
    RecordingTransport::new().with("users/by/username/elonmusk", elonmusk())
}

/// Test the health check endpoint.
///
/// Verifies:
/// - The response status is 200 OK
/// - The body names the service and carries its version
#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(Arc::new(RecordingTransport::new()));
    let (status, json_response) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["status"], "ok");
    assert_eq!(json_response["service"], "x-gateway");
    assert!(json_response["version"].is_string());
}

/// The endpoint catalog is served as JSON at `/api/docs` and as an HTML
/// table at `/`.
#[tokio::test]
async fn test_docs_and_dashboard() {
    let app = create_test_app(Arc::new(RecordingTransport::new()));
    let (status, json_response) = get_json(app.clone(), "/api/docs").await;
    assert_eq!(status, StatusCode::OK);
    let endpoints = json_response["endpoints"].as_array().unwrap();
    assert!(endpoints
        .iter()
        .any(|e| e["path"] == "/api/tweets/counts/recent"));

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let page = String::from_utf8(body.to_vec()).unwrap();
    assert!(page.contains("<table>"));
}

/// Both handle routes return the same canonical account, and absent
/// optional fields are omitted from the body.
#[tokio::test]
async fn test_account_by_handle() {
    let transport = Arc::new(with_user_lookup());
    let app = create_test_app(transport.clone());

    let (status, json_response) = get_json(app.clone(), "/api/user/elonmusk").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["id"], "44196397");
    assert_eq!(json_response["username"], "elonmusk");
    assert_eq!(json_response["metrics"]["followers_count"], 180000000u64);
    assert!(json_response.get("description").is_none());

    let (status, alias) = get_json(app, "/api/users/by/username/elonmusk").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alias, json_response);
    assert_eq!(
        transport.param(0, "user.fields").unwrap(),
        "id,name,username,description,profile_image_url,verified,created_at,public_metrics"
    );
}

/// Bare prefixes answer with their `MISSING_*` validation error and never
/// reach upstream.
#[tokio::test]
async fn test_missing_path_segments() {
    let transport = Arc::new(RecordingTransport::new());
    let app = create_test_app(transport.clone());

    for (uri, code) in [
        ("/api/user/", "MISSING_USERNAME"),
        ("/api/users/", "MISSING_USER_ID"),
        ("/api/tweets/", "MISSING_TWEET_ID"),
    ] {
        let (status, json_response) = get_json(app.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json_response["error"], code);
        assert_eq!(json_response["code"], 400);
    }
    assert!(transport.calls().is_empty());
}

/// Absent, empty and whitespace-only `q` values are all rejected.
#[tokio::test]
async fn test_missing_query_is_rejected() {
    let transport = Arc::new(RecordingTransport::new());
    let app = create_test_app(transport.clone());

    for uri in [
        "/api/tweets/search",
        "/api/tweets/search/recent?q=",
        "/api/users/search?q=%20%20",
        "/api/tweets/counts/recent",
    ] {
        let (status, json_response) = get_json(app.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json_response["error"], "MISSING_QUERY");
    }
    assert!(transport.calls().is_empty());
}

/// Operations that need user-context authentication fail with
/// `UNSUPPORTED_OPERATION` before any upstream call, including handle
/// resolution.
#[tokio::test]
async fn test_capability_gaps_never_reach_upstream() {
    let transport = Arc::new(with_user_lookup());
    let app = create_test_app(transport.clone());

    for (method, uri) in [
        ("GET", "/api/user/elonmusk/blocking"),
        ("GET", "/api/users/elonmusk/blocking"),
        ("GET", "/api/user/elonmusk/muting"),
        ("GET", "/api/users/elonmusk/muting"),
        ("GET", "/api/users/reposts_of_me"),
        ("PUT", "/api/tweets/1234/hidden?hidden=true"),
    ] {
        let (status, json_response) = send(app.clone(), method, uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
        assert_eq!(json_response["error"], "UNSUPPORTED_OPERATION");
        assert!(json_response["message"]
            .as_str()
            .unwrap()
            .contains("OAuth 2.0 User Context"));
    }
    assert!(transport.calls().is_empty());
}

/// Missing and blank `ids` lists.
#[tokio::test]
async fn test_batch_ids_validation() {
    let transport = Arc::new(RecordingTransport::new());
    let app = create_test_app(transport.clone());

    let (status, json_response) = get_json(app.clone(), "/api/tweets").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_response["error"], "MISSING_IDS");

    let (status, json_response) = get_json(app, "/api/users?ids=,%20,").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_response["error"], "INVALID_IDS");
    assert!(transport.calls().is_empty());
}

/// Batch lookups forward at most the first 100 ids.
#[tokio::test]
async fn test_batch_lookup_caps_at_one_hundred() {
    let ids: Vec<String> = (1..=150).map(|i| i.to_string()).collect();
    let canned: Vec<Value> = ids[..100].iter().map(|id| tweet(id, "7")).collect();
    let transport = Arc::new(RecordingTransport::new().with("tweets", json!({"data": canned})));
    let app = create_test_app(transport.clone());

    let uri = format!("/api/tweets?ids={}", ids.join(","));
    let (status, json_response) = get_json(app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["meta"]["result_count"], 100);

    let forwarded = transport.param(0, "ids").unwrap();
    assert_eq!(forwarded, ids[..100].join(","));
}

/// Ids are trimmed but otherwise forwarded as given, duplicates included.
#[tokio::test]
async fn test_batch_accounts_preserve_order_and_duplicates() {
    let transport = Arc::new(RecordingTransport::new().with(
        "users",
        json!({"data": [user("2", "two"), user("1", "one")]}),
    ));
    let app = create_test_app(transport.clone());

    let (status, json_response) = get_json(app, "/api/users?ids=2,%201,2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(transport.param(0, "ids").unwrap(), "2,1,2");
    assert_eq!(json_response["users"][0]["username"], "two");
    assert_eq!(json_response["meta"], json!({"result_count": 2}));
}

/// Test that a failed handle resolution stops every handle-addressed list.
///
/// Verifies:
/// - The response is a 500 `FETCH_ERROR` naming the handle
/// - Only the resolution endpoint was called
#[tokio::test]
async fn test_resolution_failure_skips_dependent_call() {
    let transport = Arc::new(RecordingTransport::new().failing("users/by/username/ghost", 404));
    let app = create_test_app(transport.clone());

    for suffix in ["tweets", "following", "followers", "liked", "mentions"] {
        let uri = format!("/api/user/ghost/{}", suffix);
        let (status, json_response) = get_json(app.clone(), &uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
        assert_eq!(json_response["error"], "FETCH_ERROR");
        assert!(json_response["message"]
            .as_str()
            .unwrap()
            .contains("could not resolve account @ghost"));
    }
    assert!(transport
        .endpoints()
        .iter()
        .all(|e| e == "users/by/username/ghost"));
}

/// Counts above the configured ceiling are clamped, and the upstream cursor
/// becomes `next_token` in the envelope.
#[tokio::test]
async fn test_posts_by_author_clamps_count() {
    let transport = Arc::new(with_user_lookup().with(
        "users/44196397/tweets",
        json!({
            "data": [tweet("10", "44196397"), tweet("9", "44196397")],
            "meta": {"result_count": 2, "next_token": "page2", "newest_id": "10", "oldest_id": "9"}
        }),
    ));
    let app = create_test_app(transport.clone());

    let (status, json_response) =
        get_json(app.clone(), "/api/user/elonmusk/tweets?count=500").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["user"]["id"], "44196397");
    assert_eq!(json_response["tweets"].as_array().unwrap().len(), 2);
    assert_eq!(
        json_response["meta"],
        json!({"result_count": 2, "next_token": "page2"})
    );
    // The configured ceiling for posts by author is 50.
    assert_eq!(transport.param(1, "max_results").unwrap(), "50");

    get_json(app.clone(), "/api/tweets/user/elonmusk?count=abc").await;
    assert_eq!(transport.param(3, "max_results").unwrap(), "10");

    get_json(app, "/api/user/elonmusk/tweets?count=-5&pagination_token=page2").await;
    assert_eq!(transport.param(5, "max_results").unwrap(), "10");
    assert_eq!(transport.param(5, "pagination_token").unwrap(), "page2");
}

/// The reverse-chronological timeline is served by the author-posts call.
#[tokio::test]
async fn test_reverse_chronological_matches_posts_by_author() {
    let transport = Arc::new(with_user_lookup().with(
        "users/44196397/tweets",
        json!({"data": [tweet("10", "44196397")], "meta": {"result_count": 1}}),
    ));
    let app = create_test_app(transport.clone());

    let (_, timeline) = get_json(
        app.clone(),
        "/api/user/elonmusk/timelines/reverse_chronological?count=5",
    )
    .await;
    let (_, alias) = get_json(
        app.clone(),
        "/api/users/elonmusk/timelines/reverse_chronological?count=5",
    )
    .await;
    let (_, posts) = get_json(app, "/api/user/elonmusk/tweets?count=5").await;

    assert_eq!(timeline, posts);
    assert_eq!(alias, posts);
    assert_eq!(transport.param(1, "max_results"), transport.param(5, "max_results"));
}

/// Following and followers lists are bounded by the relationship ceiling,
/// not by `MAX_TWEETS_PER_REQUEST`.
#[tokio::test]
async fn test_relationship_lists_use_wider_ceiling() {
    let transport = Arc::new(
        with_user_lookup()
            .with(
                "users/44196397/following",
                json!({
                    "data": [user("1", "one")],
                    "meta": {"result_count": 1, "next_token": "n", "previous_token": ""}
                }),
            )
            .with("users/44196397/followers", json!({"meta": {"result_count": 0}})),
    );
    let app = create_test_app(transport.clone());

    let (status, json_response) =
        get_json(app.clone(), "/api/user/elonmusk/following?count=5000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["following"][0]["username"], "one");
    assert_eq!(
        json_response["meta"],
        json!({"result_count": 1, "next_token": "n"})
    );
    assert_eq!(transport.param(1, "max_results").unwrap(), "1000");

    let (status, json_response) =
        get_json(app, "/api/user/elonmusk/followers?count=750").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["followers"], json!([]));
    assert_eq!(json_response["meta"]["result_count"], 0);
    assert_eq!(transport.param(3, "max_results").unwrap(), "750");
}

/// Liked posts and mentions.
#[tokio::test]
async fn test_liked_and_mentions_use_content_ceiling() {
    let transport = Arc::new(
        with_user_lookup()
            .with(
                "users/44196397/liked_tweets",
                json!({"data": [tweet("5", "1")], "meta": {"result_count": 1}}),
            )
            .with("users/44196397/mentions", json!({"data": [tweet("6", "2")]})),
    );
    let app = create_test_app(transport.clone());

    let (status, json_response) =
        get_json(app.clone(), "/api/user/elonmusk/liked?count=300").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["tweets"][0]["id"], "5");
    assert_eq!(transport.param(1, "max_results").unwrap(), "100");

    let (status, json_response) = get_json(app, "/api/user/elonmusk/mentions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["meta"], json!({"result_count": 1}));
    assert_eq!(transport.param(3, "max_results").unwrap(), "10");
}

/// Search forwards `pagination_token` upstream as `next_token`.
#[tokio::test]
async fn test_search_posts_forwards_cursor() {
    let transport = Arc::new(RecordingTransport::new().with(
        "tweets/search/recent",
        json!({
            "data": [tweet("1", "7"), tweet("2", "8")],
            "meta": {"result_count": 2, "next_token": "more"}
        }),
    ));
    let app = create_test_app(transport.clone());

    let (status, json_response) = get_json(
        app.clone(),
        "/api/tweets/search?q=rust%20lang&count=20&pagination_token=abc",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["tweets"].as_array().unwrap().len(), 2);
    assert_eq!(json_response["meta"]["next_token"], "more");
    assert!(json_response.get("tweet_id").is_none());
    assert_eq!(transport.param(0, "query").unwrap(), "rust lang");
    assert_eq!(transport.param(0, "next_token").unwrap(), "abc");

    let (status, recent) = get_json(app, "/api/tweets/search/recent?q=rust%20lang&count=20").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recent["tweets"], json_response["tweets"]);
}

/// Upstream search failures use the `SEARCH_ERROR` code.
#[tokio::test]
async fn test_search_failure_is_search_error() {
    let transport = Arc::new(RecordingTransport::new().failing("tweets/search/recent", 429));
    let app = create_test_app(transport);

    let (status, json_response) = get_json(app, "/api/tweets/search?q=rust").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_response["error"], "SEARCH_ERROR");
    assert_eq!(json_response["code"], 500);
}

/// Account search keeps the first occurrence of each author, in result
/// order, and counts only the deduplicated accounts.
#[tokio::test]
async fn test_search_accounts_dedups_in_first_seen_order() {
    let transport = Arc::new(RecordingTransport::new().with(
        "tweets/search/recent",
        json!({
            "data": [tweet("1", "b"), tweet("2", "a"), tweet("3", "b")],
            "includes": {"users": [user("b", "bee"), user("a", "ay"), user("b", "bee")]},
            "meta": {"result_count": 3}
        }),
    ));
    let app = create_test_app(transport.clone());

    let (status, json_response) = get_json(app, "/api/users/search?q=rust").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json_response["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert_eq!(json_response["meta"], json!({"result_count": 2}));
    assert_eq!(transport.param(0, "expansions").unwrap(), "author_id");
}

/// The post detail picks the expanded user matching `author_id`.
#[tokio::test]
async fn test_post_by_id_includes_author() {
    let transport = Arc::new(RecordingTransport::new().with(
        "tweets/1460323737035677698",
        json!({
            "data": {
                "id": "1460323737035677698",
                "text": "Introducing a new era",
                "author_id": "44196397",
                "referenced_tweets": [{"type": "replied_to", "id": "1"}]
            },
            "includes": {"users": [user("2244994945", "XDevelopers"), user("44196397", "elonmusk")]}
        }),
    ));
    let app = create_test_app(transport);

    let (status, json_response) = get_json(app, "/api/tweets/1460323737035677698").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["tweet"]["id"], "1460323737035677698");
    assert_eq!(
        json_response["tweet"]["referenced_tweets"],
        json!([{"type": "reply", "id": "1"}])
    );
    assert_eq!(json_response["author"]["username"], "elonmusk");
    assert!(json_response["tweet"].get("metrics").is_none());
}

/// An upstream 404 for a post surfaces as `FETCH_ERROR`.
#[tokio::test]
async fn test_post_not_found_is_fetch_error() {
    let transport = Arc::new(RecordingTransport::new().with(
        "tweets/404",
        json!({"errors": [{
            "title": "Not Found Error",
            "detail": "Could not find tweet with id: [404].",
            "type": "https://api.twitter.com/2/problems/resource-not-found"
        }]}),
    ));
    let app = create_test_app(transport);

    let (status, json_response) = get_json(app, "/api/tweets/404").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_response["error"], "FETCH_ERROR");
    assert!(json_response["message"]
        .as_str()
        .unwrap()
        .contains("Could not find tweet"));
}

/// Liking users, reposters and quote posts all echo the requested post id.
#[tokio::test]
async fn test_post_relationship_lists_carry_tweet_id() {
    let transport = Arc::new(
        RecordingTransport::new()
            .with(
                "tweets/42/liking_users",
                json!({"data": [user("1", "one")], "meta": {"result_count": 1}}),
            )
            .with(
                "tweets/42/retweeted_by",
                json!({"data": [user("2", "two")], "meta": {"result_count": 1, "next_token": "r"}}),
            )
            .with(
                "tweets/42/quote_tweets",
                json!({"data": [tweet("43", "3")], "meta": {"result_count": 1}}),
            ),
    );
    let app = create_test_app(transport.clone());

    let (_, liking) = get_json(app.clone(), "/api/tweets/42/liking_users?count=1000").await;
    assert_eq!(liking["tweet_id"], "42");
    assert_eq!(liking["users"][0]["id"], "1");
    assert_eq!(transport.param(0, "max_results").unwrap(), "100");

    let (_, reposting) = get_json(app.clone(), "/api/tweets/42/retweeted_by").await;
    assert_eq!(reposting["meta"]["next_token"], "r");

    let (_, quotes) = get_json(app, "/api/tweets/42/quote_tweets").await;
    assert_eq!(quotes["tweet_id"], "42");
    assert_eq!(quotes["tweets"][0]["id"], "43");
}

/// Id lookup and the authenticated account.
#[tokio::test]
async fn test_account_by_id_and_me() {
    let transport = Arc::new(
        RecordingTransport::new()
            .with("users/44196397", elonmusk())
            .with("users/me", json!({"data": user("9", "gateway_app")})),
    );
    let app = create_test_app(transport);

    let (status, json_response) = get_json(app.clone(), "/api/users/44196397").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["username"], "elonmusk");

    let (status, json_response) = get_json(app, "/api/users/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["id"], "9");
}

/// Test the post counts endpoint.
///
/// Verifies the total and bucket count, that time bounds are forwarded in
/// UTC, and that malformed or inverted time ranges are rejected without an
/// upstream call.
#[tokio::test]
async fn test_post_counts() {
    let transport = Arc::new(RecordingTransport::new().with(
        "tweets/counts/recent",
        json!({
            "data": [
                {"start": "2024-01-01T00:00:00.000Z", "end": "2024-01-01T01:00:00.000Z", "tweet_count": 3},
                {"start": "2024-01-01T01:00:00.000Z", "end": "2024-01-01T02:00:00.000Z", "tweet_count": 4}
            ],
            "meta": {"total_tweet_count": 7}
        }),
    ));
    let app = create_test_app(transport.clone());

    let (status, json_response) = get_json(
        app.clone(),
        "/api/tweets/counts/recent?q=rust&start_time=2024-01-01T00:00:00%2B02:00&end_time=2024-01-02T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["query"], "rust");
    assert_eq!(json_response["total_tweet_count"], 7);
    assert_eq!(json_response["counts"].as_array().unwrap().len(), 2);
    assert_eq!(json_response["meta"]["result_count"], 2);
    assert_eq!(
        transport.param(0, "start_time").unwrap(),
        "2023-12-31T22:00:00Z"
    );

    let (status, json_response) =
        get_json(app.clone(), "/api/tweets/counts/recent?q=rust&start_time=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_response["error"], "INVALID_TIME");

    let (status, json_response) = get_json(
        app,
        "/api/tweets/counts/recent?q=rust&start_time=2024-01-02T00:00:00Z&end_time=2024-01-01T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_response["error"], "INVALID_TIME");
    assert_eq!(transport.calls().len(), 1);
}

/// A bucket or reference missing its fields is skipped; the rest of the
/// response is still served.
#[tokio::test]
async fn test_incomplete_items_do_not_fail_the_response() {
    let transport = Arc::new(
        RecordingTransport::new()
            .with(
                "tweets/counts/recent",
                json!({
                    "data": [
                        {"end": "2024-01-01T01:00:00.000Z", "tweet_count": 3},
                        {"start": "2024-01-01T01:00:00.000Z", "end": "2024-01-01T02:00:00.000Z", "tweet_count": 4}
                    ]
                }),
            )
            .with(
                "tweets",
                json!({"data": [
                    {"id": "1", "text": "a", "referenced_tweets": [{"type": "quoted"}]},
                    tweet("2", "7")
                ]}),
            ),
    );
    let app = create_test_app(transport);

    let (status, json_response) = get_json(app.clone(), "/api/tweets/counts/recent?q=rust").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["counts"].as_array().unwrap().len(), 1);
    assert_eq!(json_response["total_tweet_count"], 4);

    let (status, json_response) = get_json(app, "/api/tweets?ids=1,2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_response["tweets"].as_array().unwrap().len(), 2);
    assert_eq!(json_response["tweets"][0]["referenced_tweets"], json!([]));
}

async fn handle_boom() -> &'static str {
    panic!("handler exploded")
}

/// A panicking handler yields a 500 `INTERNAL_ERROR` body.
#[tokio::test]
async fn test_panic_becomes_internal_error() {
    let app = with_middleware(Router::new().route("/boom", get(handle_boom)));
    let (status, json_response) = get_json(app, "/boom").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_response["error"], "INTERNAL_ERROR");
    assert_eq!(json_response["code"], 500);
}

async fn handle_slow() -> &'static str {
    tokio::time::sleep(Duration::from_millis(500)).await;
    "too late"
}

/// A handler that outlives the request time bound is answered with the
/// gateway's JSON error body instead of an empty response.
#[tokio::test]
async fn test_slow_handler_times_out_with_error_body() {
    let app = with_middleware_and_timeout(
        Router::new().route("/slow", get(handle_slow)),
        Duration::from_millis(20),
    );

    let request = Request::builder().uri("/slow").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json_response: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response["error"], "TIMEOUT");
    assert_eq!(json_response["code"], 500);
}

/// An upstream account object without an id is treated as unresolvable, and
/// the dependent call is never made.
#[tokio::test]
async fn test_account_without_id_is_unresolved() {
    let transport = Arc::new(
        RecordingTransport::new()
            .with(
                "users/by/username/blank",
                json!({"data": {"id": "", "username": "blank", "name": "Blank"}}),
            )
            .with("users/0", json!({"data": {"id": "", "username": "zero"}})),
    );
    let app = create_test_app(transport.clone());

    for uri in ["/api/user/blank", "/api/user/blank/tweets"] {
        let (status, json_response) = get_json(app.clone(), uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
        assert_eq!(json_response["error"], "FETCH_ERROR");
        assert!(json_response["message"]
            .as_str()
            .unwrap()
            .contains("could not resolve account @blank"));
    }
    assert_eq!(
        transport.endpoints(),
        vec!["users/by/username/blank", "users/by/username/blank"]
    );

    let (status, json_response) = get_json(app, "/api/users/0").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_response["error"], "FETCH_ERROR");
    assert!(json_response["message"]
        .as_str()
        .unwrap()
        .contains("no account with id 0"));
}

/// Preflight requests are answered for any origin, and every response
/// carries `x-content-type-options: nosniff`.
#[tokio::test]
async fn test_cors_preflight_and_headers() {
    let app = create_test_app(Arc::new(RecordingTransport::new()));

    let request = Request::builder()
        .uri("/api/tweets/search?q=rust")
        .method("OPTIONS")
        .header("origin", "https://example.com")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

proptest::proptest! {
    #![proptest_config(proptest::prelude::ProptestConfig::with_cases(32))]

    /// Any handle the platform cannot find costs exactly one upstream call.
    #[test]
    fn prop_unresolvable_handle_makes_one_call(handle in "[a-z][a-z0-9_]{0,14}") {
        let transport = Arc::new(RecordingTransport::new());
        let app = create_test_app(transport.clone());
        let uri = format!("/api/user/{}/followers?count=5", handle);

        let (status, json_response) = tokio_test::block_on(get_json(app, &uri));
        proptest::prop_assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        proptest::prop_assert_eq!(json_response["error"].as_str(), Some("FETCH_ERROR"));
        proptest::prop_assert_eq!(
            transport.endpoints(),
            vec![format!("users/by/username/{}", handle)]
        );
    }
}
