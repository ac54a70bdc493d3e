//! Router construction and the middleware stack.

use axum::{
    error_handling::HandleErrorLayer,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    BoxError, Router,
};
use log::{error, warn};
use std::any::Any;
use std::time::Duration;
use tower::{
    timeout::{error::Elapsed, TimeoutLayer},
    ServiceBuilder,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::docs::{handle_api_docs, handle_root};
use crate::handlers::*;
use crate::models::ErrorResponse;

/// Upper bound on the time spent serving a single request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// All gateway routes, before state and middleware are attached.
///
/// Path parameters at the same position share one name across routes, and
/// the bare-prefix routes (`/api/user/` and friends) answer with the
/// matching `MISSING_*` validation error.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/docs", get(handle_api_docs))
        // Handle-addressed account routes
        .route("/api/user/", get(handle_missing_username))
        .route("/api/user/:username", get(handle_account_by_handle))
        .route("/api/user/:username/tweets", get(handle_posts_by_author))
        .route(
            "/api/user/:username/timelines/reverse_chronological",
            get(handle_reverse_chronological),
        )
        .route("/api/user/:username/following", get(handle_following))
        .route("/api/user/:username/followers", get(handle_followers))
        .route("/api/user/:username/liked", get(handle_liked))
        .route("/api/user/:username/mentions", get(handle_mentions))
        .route("/api/user/:username/blocking", get(handle_blocking))
        .route("/api/user/:username/muting", get(handle_muting))
        // Id-addressed account routes
        .route("/api/users", get(handle_accounts_by_ids))
        .route("/api/users/", get(handle_missing_user_id))
        .route("/api/users/me", get(handle_current_account))
        .route("/api/users/search", get(handle_search_accounts))
        .route("/api/users/reposts_of_me", get(handle_reposts_of_me))
        .route(
            "/api/users/by/username/:username",
            get(handle_account_by_handle),
        )
        .route("/api/users/:user", get(handle_account_by_id))
        // `:user` is a handle on the three routes below, resolved like `:username`
        .route(
            "/api/users/:user/timelines/reverse_chronological",
            get(handle_reverse_chronological),
        )
        .route("/api/users/:user/blocking", get(handle_blocking))
        .route("/api/users/:user/muting", get(handle_muting))
        // Post routes
        .route("/api/tweets", get(handle_posts_by_ids))
        .route("/api/tweets/", get(handle_missing_tweet_id))
        .route("/api/tweets/search", get(handle_search_posts))
        .route("/api/tweets/search/recent", get(handle_search_posts))
        .route("/api/tweets/counts/recent", get(handle_post_counts))
        .route("/api/tweets/user/:username", get(handle_posts_by_author))
        .route("/api/tweets/:tweet_id", get(handle_post_by_id))
        .route("/api/tweets/:tweet_id/liking_users", get(handle_liking_users))
        .route("/api/tweets/:tweet_id/quote_tweets", get(handle_quote_tweets))
        .route("/api/tweets/:tweet_id/retweeted_by", get(handle_retweeted_by))
        .route("/api/tweets/:tweet_id/hidden", put(handle_hide_post))
}

/// Builds the complete application: routes, shared state, and middleware.
pub fn create_app(state: AppState) -> Router {
    with_middleware(api_routes().with_state(state))
}

/// Wraps a router in the gateway's middleware stack.
pub fn with_middleware(router: Router) -> Router {
    with_middleware_and_timeout(router, REQUEST_TIMEOUT)
}

/// Same stack as [`with_middleware`] with a custom request time bound.
///
/// A request that exceeds it is answered with a 500 `TIMEOUT` error body.
pub fn with_middleware_and_timeout(router: Router, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    router.layer(
        ServiceBuilder::new()
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(SetResponseHeaderLayer::if_not_present(
                X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(HandleErrorLayer::new(handle_timeout))
            .layer(TimeoutLayer::new(request_timeout)),
    )
}

fn error_body(status: StatusCode, error: &str, message: &str) -> Response {
    let body = ErrorResponse {
        error: error.to_string(),
        message: message.to_string(),
        code: status.as_u16(),
    };
    (status, Json(body)).into_response()
}

async fn handle_timeout(err: BoxError) -> Response {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    if err.is::<Elapsed>() {
        warn!("Request timed out");
        return error_body(status, "TIMEOUT", "request timed out");
    }
    error!("Unhandled middleware error: {}", err);
    error_body(status, "INTERNAL_ERROR", "internal server error")
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!("Request handler panicked: {}", detail);
    error_body(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "internal server error",
    )
}
