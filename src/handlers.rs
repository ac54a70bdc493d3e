//! HTTP route handlers for the gateway.
//!
//! Handlers extract path and query parameters, run the request-level
//! validation that needs no upstream call, and delegate to
//! [`GatewayService`]. Failures are logged here and rendered by
//! [`GatewayError`]'s `IntoResponse` implementation.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use log::{log, Level};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::GatewayError;
use crate::models::{
    Account, AccountPostsResponse, AccountsResponse, CountsResponse, FollowersResponse,
    FollowingResponse, PostDetailResponse, PostsResponse,
};
use crate::params::{parse_time, require, split_ids};
use crate::service::{GatewayService, PageRequest};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GatewayService>,
}

impl AppState {
    pub fn new(service: GatewayService) -> Self {
        AppState {
            service: Arc::new(service),
        }
    }
}

/// Query parameters accepted across the API. Every field is optional here;
/// each handler decides which ones it requires.
#[derive(Debug, Default, Deserialize)]
pub struct ApiParams {
    pub count: Option<String>,
    pub pagination_token: Option<String>,
    pub q: Option<String>,
    pub ids: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub hidden: Option<String>,
}

impl ApiParams {
    fn page(&self) -> PageRequest<'_> {
        PageRequest::new(self.count.as_deref(), self.pagination_token.as_deref())
    }

    fn query(&self) -> Result<&str, GatewayError> {
        require(
            self.q.as_deref(),
            "MISSING_QUERY",
            "query parameter 'q' is required",
        )
    }
}

type ApiResult<T> = Result<Json<T>, GatewayError>;

/// Log level for a failed operation.
///
/// Missing resources and capability gaps are expected outcomes and log as
/// warnings; upstream faults log as errors.
fn failure_level(e: &GatewayError) -> Level {
    match (e, e.platform_error()) {
        (GatewayError::Validation { .. } | GatewayError::Unsupported { .. }, _) => Level::Warn,
        (_, Some(source)) if source.is_not_found() => Level::Warn,
        _ => Level::Error,
    }
}

fn respond<T: Serialize>(operation: &str, result: Result<T, GatewayError>) -> ApiResult<T> {
    match result {
        Ok(body) => Ok(Json(body)),
        Err(e) => {
            let hint = match e.platform_error() {
                Some(source) if source.is_permission() => {
                    " (check the Bearer Token and the app's access level)"
                }
                _ => "",
            };
            log!(
                failure_level(&e),
                "{} failed [{}]: {}{}",
                operation,
                e.code(),
                e,
                hint
            );
            Err(e)
        }
    }
}

fn handle_param(raw: &str) -> Result<&str, GatewayError> {
    require(Some(raw), "MISSING_USERNAME", "username is required")
}

fn user_id_param(raw: &str) -> Result<&str, GatewayError> {
    require(Some(raw), "MISSING_USER_ID", "user id is required")
}

fn tweet_id_param(raw: &str) -> Result<&str, GatewayError> {
    require(Some(raw), "MISSING_TWEET_ID", "tweet id is required")
}

/// Handles GET requests to the `/health` endpoint.
///
/// # Example Response
///
/// ```json
/// {
///   "status": "ok",
///   "service": "x-gateway",
///   "version": "0.1.0"
/// }
/// ```
pub async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /api/user/:username` and `GET /api/users/by/username/:username`.
pub async fn handle_account_by_handle(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Account> {
    let handle = handle_param(&username)?;
    respond(
        "account lookup",
        state.service.account_by_handle(handle).await,
    )
}

/// Bare `/api/user/` prefix: the handle segment is missing.
pub async fn handle_missing_username() -> Result<Json<Value>, GatewayError> {
    Err(GatewayError::validation(
        "MISSING_USERNAME",
        "username is required",
    ))
}

/// Bare `/api/users/` prefix.
pub async fn handle_missing_user_id() -> Result<Json<Value>, GatewayError> {
    Err(GatewayError::validation("MISSING_USER_ID", "user id is required"))
}

/// Bare `/api/tweets/` prefix.
pub async fn handle_missing_tweet_id() -> Result<Json<Value>, GatewayError> {
    Err(GatewayError::validation("MISSING_TWEET_ID", "tweet id is required"))
}

/// `GET /api/user/:username/tweets` and `GET /api/tweets/user/:username`.
pub async fn handle_posts_by_author(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<ApiParams>,
) -> ApiResult<AccountPostsResponse> {
    let handle = handle_param(&username)?;
    respond(
        "posts by author",
        state.service.posts_by_author(handle, params.page()).await,
    )
}

/// `GET /api/user/:username/timelines/reverse_chronological`.
pub async fn handle_reverse_chronological(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<ApiParams>,
) -> ApiResult<AccountPostsResponse> {
    let handle = handle_param(&username)?;
    respond(
        "reverse chronological timeline",
        state
            .service
            .reverse_chronological_timeline(handle, params.page())
            .await,
    )
}

/// Handles GET requests to `/api/user/:username/following`.
///
/// Resolves the handle, then lists the accounts it follows. `count` is
/// bounded by the relationship ceiling rather than the post ceiling.
///
/// # Example Response
///
/// ```json
/// {
///   "user": {"id": "44196397", "username": "elonmusk", "name": "Elon Musk"},
///   "following": [{"id": "12", "username": "jack", "name": "jack"}],
///   "meta": {"result_count": 1, "next_token": "7140dibdnow9c7btw481"}
/// }
/// ```
pub async fn handle_following(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<ApiParams>,
) -> ApiResult<FollowingResponse> {
    let handle = handle_param(&username)?;
    respond(
        "following",
        state.service.following(handle, params.page()).await,
    )
}

/// `GET /api/user/:username/followers`. Same shape as
/// [`handle_following`] with a `followers` list.
pub async fn handle_followers(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<ApiParams>,
) -> ApiResult<FollowersResponse> {
    let handle = handle_param(&username)?;
    respond(
        "followers",
        state.service.followers(handle, params.page()).await,
    )
}

/// `GET /api/user/:username/liked`.
pub async fn handle_liked(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<ApiParams>,
) -> ApiResult<AccountPostsResponse> {
    let handle = handle_param(&username)?;
    respond(
        "liked posts",
        state.service.liked_posts(handle, params.page()).await,
    )
}

/// `GET /api/user/:username/mentions`.
pub async fn handle_mentions(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<ApiParams>,
) -> ApiResult<AccountPostsResponse> {
    let handle = handle_param(&username)?;
    respond(
        "mentions",
        state.service.mentions(handle, params.page()).await,
    )
}

/// `GET /api/user{,s}/:handle/blocking`.
///
/// Listing blocked accounts needs user-context authentication, so this
/// always answers `UNSUPPORTED_OPERATION` without calling upstream.
pub async fn handle_blocking(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<ApiParams>,
) -> ApiResult<AccountsResponse> {
    let handle = handle_param(&username)?;
    respond(
        "block list",
        state.service.block_list(handle, params.page()).await,
    )
}

/// `GET /api/user{,s}/:handle/muting`. A capability gap like
/// [`handle_blocking`].
pub async fn handle_muting(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<ApiParams>,
) -> ApiResult<AccountsResponse> {
    let handle = handle_param(&username)?;
    respond(
        "mute list",
        state.service.mute_list(handle, params.page()).await,
    )
}

/// `GET /api/users?ids=1,2,3`.
pub async fn handle_accounts_by_ids(
    State(state): State<AppState>,
    Query(params): Query<ApiParams>,
) -> ApiResult<AccountsResponse> {
    let ids = split_ids(params.ids.as_deref())?;
    respond(
        "batch account lookup",
        state.service.accounts_by_ids(ids).await,
    )
}

/// `GET /api/users/:user`, where `:user` is a numeric account id.
pub async fn handle_account_by_id(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Account> {
    let id = user_id_param(&user_id)?;
    respond("account by id", state.service.account_by_id(id).await)
}

/// `GET /api/users/me`.
pub async fn handle_current_account(State(state): State<AppState>) -> ApiResult<Account> {
    respond(
        "authenticated account",
        state.service.current_account().await,
    )
}

/// `GET /api/users/search?q=`. See [`GatewayService::search_accounts`].
pub async fn handle_search_accounts(
    State(state): State<AppState>,
    Query(params): Query<ApiParams>,
) -> ApiResult<AccountsResponse> {
    let query = params.query()?;
    respond(
        "account search",
        state.service.search_accounts(query, params.page()).await,
    )
}

/// `GET /api/users/reposts_of_me`. Always a capability gap.
pub async fn handle_reposts_of_me(
    State(state): State<AppState>,
    Query(params): Query<ApiParams>,
) -> ApiResult<PostsResponse> {
    respond(
        "reposts of me",
        state.service.reposts_of_me(params.page()).await,
    )
}

/// `GET /api/tweets?ids=1,2,3`.
pub async fn handle_posts_by_ids(
    State(state): State<AppState>,
    Query(params): Query<ApiParams>,
) -> ApiResult<PostsResponse> {
    let ids = split_ids(params.ids.as_deref())?;
    respond("batch post lookup", state.service.posts_by_ids(ids).await)
}

/// `GET /api/tweets/search?q=` and `GET /api/tweets/search/recent?q=`.
pub async fn handle_search_posts(
    State(state): State<AppState>,
    Query(params): Query<ApiParams>,
) -> ApiResult<PostsResponse> {
    let query = params.query()?;
    respond(
        "post search",
        state.service.search_posts(query, params.page()).await,
    )
}

/// `GET /api/tweets/counts/recent?q=&start_time=&end_time=`.
pub async fn handle_post_counts(
    State(state): State<AppState>,
    Query(params): Query<ApiParams>,
) -> ApiResult<CountsResponse> {
    let query = params.query()?;
    let start_time = parse_time(params.start_time.as_deref(), "start_time")?;
    let end_time = parse_time(params.end_time.as_deref(), "end_time")?;
    respond(
        "post counts",
        state.service.post_counts(query, start_time, end_time).await,
    )
}

/// Handles GET requests to `/api/tweets/:tweet_id`.
///
/// # Returns
///
/// The post together with its author when the upstream expansion carried one.
pub async fn handle_post_by_id(
    State(state): State<AppState>,
    Path(tweet_id): Path<String>,
) -> ApiResult<PostDetailResponse> {
    let id = tweet_id_param(&tweet_id)?;
    respond("post lookup", state.service.post_by_id(id).await)
}

/// `GET /api/tweets/:tweet_id/liking_users`.
pub async fn handle_liking_users(
    State(state): State<AppState>,
    Path(tweet_id): Path<String>,
    Query(params): Query<ApiParams>,
) -> ApiResult<AccountsResponse> {
    let id = tweet_id_param(&tweet_id)?;
    respond(
        "liking accounts",
        state.service.liking_accounts(id, params.page()).await,
    )
}

pub async fn handle_quote_tweets(
    State(state): State<AppState>,
    Path(tweet_id): Path<String>,
    Query(params): Query<ApiParams>,
) -> ApiResult<PostsResponse> {
    let id = tweet_id_param(&tweet_id)?;
    respond(
        "quote posts",
        state.service.quote_posts(id, params.page()).await,
    )
}

/// `GET /api/tweets/:tweet_id/retweeted_by`.
pub async fn handle_retweeted_by(
    State(state): State<AppState>,
    Path(tweet_id): Path<String>,
    Query(params): Query<ApiParams>,
) -> ApiResult<AccountsResponse> {
    let id = tweet_id_param(&tweet_id)?;
    respond(
        "reposting accounts",
        state.service.reposting_accounts(id, params.page()).await,
    )
}

/// `PUT /api/tweets/:tweet_id/hidden`. Always a capability gap.
pub async fn handle_hide_post(
    State(state): State<AppState>,
    Path(tweet_id): Path<String>,
    Query(params): Query<ApiParams>,
) -> ApiResult<PostDetailResponse> {
    let id = tweet_id_param(&tweet_id)?;
    let hidden = params.hidden.as_deref().map(|h| h.eq_ignore_ascii_case("true"));
    respond(
        "post visibility",
        state.service.set_post_hidden(id, hidden).await,
    )
}
