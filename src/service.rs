//! Gateway operations over the Twitter/X API.
//!
//! [`GatewayService`] exposes one method per supported read operation. Each
//! method clamps its parameters, issues one upstream call (two when a handle
//! must first be resolved to an account id), and reshapes the result into the
//! canonical response bodies of [`crate::models`].

use chrono::{DateTime, SecondsFormat, Utc};
use log::{info, warn};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::envelope::{build_meta, count_only};
use crate::error::{GatewayError, PlatformError};
use crate::models::{
    Account, AccountPostsResponse, AccountsResponse, CountsResponse, FollowersResponse,
    FollowingResponse, Meta, Post, PostDetailResponse, PostsResponse,
};
use crate::params::{CountCeiling, CountPolicy, BATCH_LOOKUP_LIMIT};
use crate::twitter::wire::{
    self, ApiResponse, CountsMeta, Includes, Lookup, NoMeta,
};
use crate::twitter::{accounts, count_bucket, posts, ApiTransport, QueryParams};

const USER_FIELDS: &str =
    "id,name,username,description,profile_image_url,verified,created_at,public_metrics";
const TWEET_FIELDS: &str =
    "id,text,author_id,created_at,public_metrics,entities,referenced_tweets";

/// Pagination inputs of a list operation, as received from the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRequest<'a> {
    pub count: Option<&'a str>,
    pub pagination_token: Option<&'a str>,
}

impl<'a> PageRequest<'a> {
    pub fn new(count: Option<&'a str>, pagination_token: Option<&'a str>) -> Self {
        PageRequest {
            count,
            pagination_token,
        }
    }
}

/// The platform client adapter shared by all request handlers.
pub struct GatewayService {
    transport: Arc<dyn ApiTransport>,
    counts: CountPolicy,
}

fn user_fields() -> (&'static str, String) {
    ("user.fields", USER_FIELDS.to_string())
}

fn tweet_fields() -> (&'static str, String) {
    ("tweet.fields", TWEET_FIELDS.to_string())
}

fn push_token(query: &mut QueryParams, name: &'static str, token: Option<&str>) {
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        query.push((name, token.to_string()));
    }
}

fn fetch_error(operation: &'static str) -> impl FnOnce(PlatformError) -> GatewayError {
    move |source| GatewayError::Fetch { operation, source }
}

fn search_error(operation: &'static str) -> impl FnOnce(PlatformError) -> GatewayError {
    move |source| GatewayError::Search { operation, source }
}

/// Keeps the first [`BATCH_LOOKUP_LIMIT`] ids in caller order.
fn cap_batch(mut ids: Vec<String>, kind: &str) -> Vec<String> {
    if ids.len() > BATCH_LOOKUP_LIMIT {
        warn!(
            "Batch {} lookup received {} ids, forwarding the first {} and dropping {}",
            kind,
            ids.len(),
            BATCH_LOOKUP_LIMIT,
            ids.len() - BATCH_LOOKUP_LIMIT
        );
        ids.truncate(BATCH_LOOKUP_LIMIT);
    }
    ids
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl GatewayService {
    pub fn new(transport: Arc<dyn ApiTransport>, config: &GatewayConfig) -> Self {
        GatewayService {
            transport,
            counts: CountPolicy::from_config(config),
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: QueryParams,
    ) -> Result<T, PlatformError> {
        let value = self.transport.get_json(endpoint, &query).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn fetch_list<T, M>(
        &self,
        endpoint: &str,
        query: QueryParams,
    ) -> Result<(Vec<T>, Option<Includes>, Option<M>), PlatformError>
    where
        T: DeserializeOwned,
        M: DeserializeOwned,
    {
        let response: ApiResponse<Vec<T>, M> = self.fetch(endpoint, query).await?;
        response.into_list()
    }

    async fn fetch_one<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: QueryParams,
    ) -> Result<(T, Option<Includes>), PlatformError> {
        let response: Lookup<T> = self.fetch(endpoint, query).await?;
        let (data, includes, _) = response.into_data()?;
        Ok((data, includes))
    }

    async fn lookup_handle(&self, handle: &str) -> Result<Account, PlatformError> {
        let endpoint = format!("users/by/username/{}", urlencoding::encode(handle));
        let (user, _) = self
            .fetch_one::<wire::User>(&endpoint, vec![user_fields()])
            .await?;
        if user.id.is_empty() {
            return Err(PlatformError::NotFound(format!(
                "no account with username {}",
                handle
            )));
        }
        Ok(Account::from(user))
    }

    /// Resolves a handle to its account.
    ///
    /// Every handle-addressed operation calls this first; when it fails the
    /// dependent call is never issued.
    pub async fn resolve_account(&self, handle: &str) -> Result<Account, GatewayError> {
        info!("Resolving account @{}", handle);
        let account = self
            .lookup_handle(handle)
            .await
            .map_err(|source| GatewayError::Resolution {
                handle: handle.to_string(),
                source,
            })?;
        info!("Resolved @{} to account {}", account.username, account.id);
        Ok(account)
    }

    /// Account by handle.
    pub async fn account_by_handle(&self, handle: &str) -> Result<Account, GatewayError> {
        self.resolve_account(handle).await
    }

    /// Account by numeric id.
    pub async fn account_by_id(&self, id: &str) -> Result<Account, GatewayError> {
        info!("Fetching account by id {}", id);
        let endpoint = format!("users/{}", urlencoding::encode(id));
        let (user, _) = self
            .fetch_one::<wire::User>(&endpoint, vec![user_fields()])
            .await
            .map_err(fetch_error("account"))?;
        if user.id.is_empty() {
            return Err(GatewayError::Fetch {
                operation: "account",
                source: PlatformError::NotFound(format!("no account with id {}", id)),
            });
        }
        Ok(Account::from(user))
    }

    /// The account that owns the configured credential.
    pub async fn current_account(&self) -> Result<Account, GatewayError> {
        info!("Fetching authenticated account");
        let (user, _) = self
            .fetch_one::<wire::User>("users/me", vec![user_fields()])
            .await
            .map_err(fetch_error("authenticated account"))?;
        Ok(Account::from(user))
    }

    /// Posts authored by an account, newest first.
    pub async fn posts_by_author(
        &self,
        handle: &str,
        page: PageRequest<'_>,
    ) -> Result<AccountPostsResponse, GatewayError> {
        let user = self.resolve_account(handle).await?;
        let max_results = self.counts.resolve(page.count, CountCeiling::AuthorPosts);
        info!(
            "Fetching posts by @{} (max_results={})",
            user.username, max_results
        );

        let mut query = vec![("max_results", max_results.to_string()), tweet_fields()];
        push_token(&mut query, "pagination_token", page.pagination_token);
        let (tweets, _, meta) = self
            .fetch_list::<wire::Tweet, wire::TimelineMeta>(
                &format!("users/{}/tweets", user.id),
                query,
            )
            .await
            .map_err(fetch_error("posts"))?;

        let tweets = posts(tweets);
        info!("Fetched {} posts by @{}", tweets.len(), user.username);
        Ok(AccountPostsResponse {
            meta: build_meta(meta.as_ref(), tweets.len()),
            user,
            tweets,
        })
    }

    /// Reverse-chronological timeline. Identical to [`Self::posts_by_author`].
    pub async fn reverse_chronological_timeline(
        &self,
        handle: &str,
        page: PageRequest<'_>,
    ) -> Result<AccountPostsResponse, GatewayError> {
        self.posts_by_author(handle, page).await
    }

    /// Accounts the given account follows.
    pub async fn following(
        &self,
        handle: &str,
        page: PageRequest<'_>,
    ) -> Result<FollowingResponse, GatewayError> {
        let user = self.resolve_account(handle).await?;
        let (following, meta) = self
            .relationship_list(&user, "following", page)
            .await
            .map_err(fetch_error("following"))?;
        Ok(FollowingResponse {
            user,
            following,
            meta,
        })
    }

    /// Accounts following the given account.
    pub async fn followers(
        &self,
        handle: &str,
        page: PageRequest<'_>,
    ) -> Result<FollowersResponse, GatewayError> {
        let user = self.resolve_account(handle).await?;
        let (followers, meta) = self
            .relationship_list(&user, "followers", page)
            .await
            .map_err(fetch_error("followers"))?;
        Ok(FollowersResponse {
            user,
            followers,
            meta,
        })
    }

    async fn relationship_list(
        &self,
        user: &Account,
        relation: &str,
        page: PageRequest<'_>,
    ) -> Result<(Vec<Account>, Meta), PlatformError> {
        let max_results = self
            .counts
            .resolve(page.count, CountCeiling::RelationshipList);
        info!(
            "Fetching {} of @{} (max_results={})",
            relation, user.username, max_results
        );

        let mut query = vec![("max_results", max_results.to_string()), user_fields()];
        push_token(&mut query, "pagination_token", page.pagination_token);
        let (users, _, meta) = self
            .fetch_list::<wire::User, wire::PaginationMeta>(
                &format!("users/{}/{}", user.id, relation),
                query,
            )
            .await?;

        let users = accounts(users);
        info!(
            "Fetched {} {} accounts for @{}",
            users.len(),
            relation,
            user.username
        );
        let meta = build_meta(meta.as_ref(), users.len());
        Ok((users, meta))
    }

    /// Posts the given account has liked.
    pub async fn liked_posts(
        &self,
        handle: &str,
        page: PageRequest<'_>,
    ) -> Result<AccountPostsResponse, GatewayError> {
        let user = self.resolve_account(handle).await?;
        let max_results = self.counts.resolve(page.count, CountCeiling::ContentList);
        info!(
            "Fetching posts liked by @{} (max_results={})",
            user.username, max_results
        );

        let mut query = vec![("max_results", max_results.to_string()), tweet_fields()];
        push_token(&mut query, "pagination_token", page.pagination_token);
        let (tweets, _, meta) = self
            .fetch_list::<wire::Tweet, wire::PaginationMeta>(
                &format!("users/{}/liked_tweets", user.id),
                query,
            )
            .await
            .map_err(fetch_error("liked posts"))?;

        let tweets = posts(tweets);
        info!("Fetched {} posts liked by @{}", tweets.len(), user.username);
        Ok(AccountPostsResponse {
            meta: build_meta(meta.as_ref(), tweets.len()),
            user,
            tweets,
        })
    }

    /// Posts mentioning the given account.
    pub async fn mentions(
        &self,
        handle: &str,
        page: PageRequest<'_>,
    ) -> Result<AccountPostsResponse, GatewayError> {
        let user = self.resolve_account(handle).await?;
        let max_results = self.counts.resolve(page.count, CountCeiling::ContentList);
        info!(
            "Fetching mentions of @{} (max_results={})",
            user.username, max_results
        );

        let mut query = vec![("max_results", max_results.to_string()), tweet_fields()];
        push_token(&mut query, "pagination_token", page.pagination_token);
        let (tweets, _, meta) = self
            .fetch_list::<wire::Tweet, wire::TimelineMeta>(
                &format!("users/{}/mentions", user.id),
                query,
            )
            .await
            .map_err(fetch_error("mentions"))?;

        let tweets = posts(tweets);
        info!("Fetched {} mentions of @{}", tweets.len(), user.username);
        Ok(AccountPostsResponse {
            meta: build_meta(meta.as_ref(), tweets.len()),
            user,
            tweets,
        })
    }

    /// Recent posts matching a search query.
    pub async fn search_posts(
        &self,
        query_text: &str,
        page: PageRequest<'_>,
    ) -> Result<PostsResponse, GatewayError> {
        let max_results = self.counts.resolve(page.count, CountCeiling::ContentList);
        info!(
            "Searching posts for '{}' (max_results={})",
            query_text, max_results
        );

        let mut query = vec![
            ("query", query_text.to_string()),
            ("max_results", max_results.to_string()),
            tweet_fields(),
        ];
        push_token(&mut query, "next_token", page.pagination_token);
        let (tweets, _, meta) = self
            .fetch_list::<wire::Tweet, wire::PaginationMeta>("tweets/search/recent", query)
            .await
            .map_err(search_error("posts"))?;

        let tweets = posts(tweets);
        info!("Found {} posts for '{}'", tweets.len(), query_text);
        Ok(PostsResponse {
            tweet_id: None,
            meta: build_meta(meta.as_ref(), tweets.len()),
            tweets,
        })
    }

    /// Accounts discovered through a post search.
    ///
    /// App-only credentials have no keyword account search, so this runs a
    /// recent-post search and returns the authors of the matching posts,
    /// deduplicated by id in first-seen order. The result is a byproduct of the
    /// post search: it is neither complete nor ranked as an account directory.
    pub async fn search_accounts(
        &self,
        query_text: &str,
        page: PageRequest<'_>,
    ) -> Result<AccountsResponse, GatewayError> {
        let max_results = self.counts.resolve(page.count, CountCeiling::ContentList);
        info!(
            "Searching accounts for '{}' (max_results={})",
            query_text, max_results
        );

        let query = vec![
            ("query", query_text.to_string()),
            ("max_results", max_results.to_string()),
            ("tweet.fields", "author_id".to_string()),
            ("expansions", "author_id".to_string()),
            user_fields(),
        ];
        let (_, includes, _) = self
            .fetch_list::<wire::Tweet, wire::PaginationMeta>("tweets/search/recent", query)
            .await
            .map_err(search_error("accounts"))?;

        let mut seen = HashSet::new();
        let users: Vec<Account> = includes
            .map(|i| i.users)
            .unwrap_or_default()
            .into_iter()
            .filter(|u| !u.id.is_empty() && seen.insert(u.id.clone()))
            .map(Account::from)
            .collect();

        info!("Found {} accounts for '{}'", users.len(), query_text);
        Ok(AccountsResponse {
            tweet_id: None,
            meta: count_only(users.len()),
            users,
        })
    }

    /// A single post with its author expansion.
    pub async fn post_by_id(&self, id: &str) -> Result<PostDetailResponse, GatewayError> {
        info!("Fetching post {}", id);
        let query = vec![
            tweet_fields(),
            ("expansions", "author_id".to_string()),
            user_fields(),
        ];
        let (tweet, includes) = self
            .fetch_one::<wire::Tweet>(&format!("tweets/{}", urlencoding::encode(id)), query)
            .await
            .map_err(fetch_error("post"))?;

        let tweet = Post::from(tweet);
        let mut users = includes.map(|i| i.users).unwrap_or_default();
        let position = users
            .iter()
            .position(|u| Some(u.id.as_str()) == tweet.author_id.as_deref())
            .unwrap_or(0);
        let author = (position < users.len()).then(|| Account::from(users.swap_remove(position)));

        Ok(PostDetailResponse { tweet, author })
    }

    /// Posts by id, at most [`BATCH_LOOKUP_LIMIT`] per call.
    pub async fn posts_by_ids(&self, ids: Vec<String>) -> Result<PostsResponse, GatewayError> {
        let ids = cap_batch(ids, "post");
        info!("Fetching {} posts by id", ids.len());
        let query = vec![("ids", ids.join(",")), tweet_fields()];
        let (tweets, _, _) = self
            .fetch_list::<wire::Tweet, NoMeta>("tweets", query)
            .await
            .map_err(fetch_error("posts"))?;

        let tweets = posts(tweets);
        Ok(PostsResponse {
            tweet_id: None,
            meta: count_only(tweets.len()),
            tweets,
        })
    }

    /// Accounts by id, at most [`BATCH_LOOKUP_LIMIT`] per call.
    pub async fn accounts_by_ids(
        &self,
        ids: Vec<String>,
    ) -> Result<AccountsResponse, GatewayError> {
        let ids = cap_batch(ids, "account");
        info!("Fetching {} accounts by id", ids.len());
        let query = vec![("ids", ids.join(",")), user_fields()];
        let (users, _, _) = self
            .fetch_list::<wire::User, NoMeta>("users", query)
            .await
            .map_err(fetch_error("accounts"))?;

        let users = accounts(users);
        Ok(AccountsResponse {
            tweet_id: None,
            meta: count_only(users.len()),
            users,
        })
    }

    /// Accounts that liked a post.
    pub async fn liking_accounts(
        &self,
        tweet_id: &str,
        page: PageRequest<'_>,
    ) -> Result<AccountsResponse, GatewayError> {
        self.accounts_for_post(tweet_id, "liking_users", page)
            .await
            .map_err(fetch_error("liking accounts"))
    }

    /// Accounts that reposted a post.
    pub async fn reposting_accounts(
        &self,
        tweet_id: &str,
        page: PageRequest<'_>,
    ) -> Result<AccountsResponse, GatewayError> {
        self.accounts_for_post(tweet_id, "retweeted_by", page)
            .await
            .map_err(fetch_error("reposting accounts"))
    }

    async fn accounts_for_post(
        &self,
        tweet_id: &str,
        relation: &str,
        page: PageRequest<'_>,
    ) -> Result<AccountsResponse, PlatformError> {
        let max_results = self.counts.resolve(page.count, CountCeiling::ContentList);
        info!(
            "Fetching {} of post {} (max_results={})",
            relation, tweet_id, max_results
        );

        let mut query = vec![("max_results", max_results.to_string()), user_fields()];
        push_token(&mut query, "pagination_token", page.pagination_token);
        let (users, _, meta) = self
            .fetch_list::<wire::User, wire::PaginationMeta>(
                &format!("tweets/{}/{}", urlencoding::encode(tweet_id), relation),
                query,
            )
            .await?;

        let users = accounts(users);
        Ok(AccountsResponse {
            tweet_id: Some(tweet_id.to_string()),
            meta: build_meta(meta.as_ref(), users.len()),
            users,
        })
    }

    /// Posts quoting a post.
    pub async fn quote_posts(
        &self,
        tweet_id: &str,
        page: PageRequest<'_>,
    ) -> Result<PostsResponse, GatewayError> {
        let max_results = self.counts.resolve(page.count, CountCeiling::ContentList);
        info!(
            "Fetching quote posts of {} (max_results={})",
            tweet_id, max_results
        );

        let mut query = vec![("max_results", max_results.to_string()), tweet_fields()];
        push_token(&mut query, "pagination_token", page.pagination_token);
        let (tweets, _, meta) = self
            .fetch_list::<wire::Tweet, wire::PaginationMeta>(
                &format!("tweets/{}/quote_tweets", urlencoding::encode(tweet_id)),
                query,
            )
            .await
            .map_err(fetch_error("quote posts"))?;

        let tweets = posts(tweets);
        Ok(PostsResponse {
            tweet_id: Some(tweet_id.to_string()),
            meta: build_meta(meta.as_ref(), tweets.len()),
            tweets,
        })
    }

    /// Post volume over a time range for a search query.
    pub async fn post_counts(
        &self,
        query_text: &str,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<CountsResponse, GatewayError> {
        if let (Some(start), Some(end)) = (start_time, end_time) {
            if start >= end {
                return Err(GatewayError::validation(
                    "INVALID_TIME",
                    "start_time must be earlier than end_time",
                ));
            }
        }
        info!(
            "Fetching post counts for '{}' ({:?} - {:?})",
            query_text, start_time, end_time
        );

        let mut query = vec![("query", query_text.to_string())];
        if let Some(start) = start_time {
            query.push(("start_time", format_time(start)));
        }
        if let Some(end) = end_time {
            query.push(("end_time", format_time(end)));
        }
        let (data, _, meta) = self
            .fetch_list::<wire::CountData, CountsMeta>("tweets/counts/recent", query)
            .await
            .map_err(fetch_error("post counts"))?;

        let counts: Vec<_> = data.into_iter().filter_map(count_bucket).collect();
        let meta = meta.unwrap_or_default();
        let total_tweet_count = meta
            .total_tweet_count
            .unwrap_or_else(|| counts.iter().map(|c| c.tweet_count).sum());

        Ok(CountsResponse {
            query: query_text.to_string(),
            meta: Meta {
                result_count: counts.len(),
                next_token: meta.next_token.filter(|t| !t.is_empty()),
                previous_token: None,
            },
            counts,
            total_tweet_count,
        })
    }

    /// Block list. Requires user-context authentication.
    pub async fn block_list(
        &self,
        handle: &str,
        _page: PageRequest<'_>,
    ) -> Result<AccountsResponse, GatewayError> {
        Err(unsupported("block list retrieval", handle))
    }

    /// Mute list. Requires user-context authentication.
    pub async fn mute_list(
        &self,
        handle: &str,
        _page: PageRequest<'_>,
    ) -> Result<AccountsResponse, GatewayError> {
        Err(unsupported("mute list retrieval", handle))
    }

    /// Hides or unhides a reply. Requires user-context authentication.
    pub async fn set_post_hidden(
        &self,
        tweet_id: &str,
        _hidden: Option<bool>,
    ) -> Result<PostDetailResponse, GatewayError> {
        Err(unsupported("post visibility toggling", tweet_id))
    }

    /// Reposts of the authenticated account's posts. Requires user-context authentication.
    pub async fn reposts_of_me(
        &self,
        _page: PageRequest<'_>,
    ) -> Result<PostsResponse, GatewayError> {
        Err(unsupported("reposts of me", "me"))
    }
}

fn unsupported(operation: &'static str, target: &str) -> GatewayError {
    warn!(
        "Rejecting {} for '{}': not available with an app-only Bearer Token",
        operation, target
    );
    GatewayError::Unsupported { operation }
}
