//! Endpoint catalog served at `/api/docs` and rendered as the `/` dashboard.

use axum::response::{Html, Json};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct EndpointDoc {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
    pub parameters: &'static [(&'static str, &'static str)],
    pub example: &'static str,
}

const COUNT_100: (&str, &str) = (
    "count",
    "number of results (default: DEFAULT_TWEETS_COUNT, max: 100)",
);
const COUNT_1000: (&str, &str) = (
    "count",
    "number of results (default: DEFAULT_TWEETS_COUNT, max: 1000)",
);
const PAGINATION: (&str, &str) = ("pagination_token", "cursor from a previous page (optional)");
const AUTHOR_COUNT: (&str, &str) = (
    "count",
    "number of posts (default: DEFAULT_TWEETS_COUNT, max: MAX_TWEETS_PER_REQUEST)",
);
const USERNAME: (&str, &str) = ("username", "account handle");
const TWEET_ID: (&str, &str) = ("tweet_id", "post id");

pub const ENDPOINTS: &[EndpointDoc] = &[
    EndpointDoc {
        method: "GET",
        path: "/health",
        description: "Health check",
        parameters: &[],
        example: "/health",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/user/{username}",
        description: "Account by handle",
        parameters: &[USERNAME],
        example: "/api/user/elonmusk",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/user/{username}/tweets",
        description: "Recent posts by an account",
        parameters: &[USERNAME, AUTHOR_COUNT, PAGINATION],
        example: "/api/user/elonmusk/tweets?count=20",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/user/{username}/timelines/reverse_chronological",
        description: "Reverse-chronological timeline of an account's own posts",
        parameters: &[USERNAME, AUTHOR_COUNT, PAGINATION],
        example: "/api/user/elonmusk/timelines/reverse_chronological",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/user/{username}/following",
        description: "Accounts followed by an account",
        parameters: &[USERNAME, COUNT_1000, PAGINATION],
        example: "/api/user/elonmusk/following?count=100",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/user/{username}/followers",
        description: "Followers of an account",
        parameters: &[USERNAME, COUNT_1000, PAGINATION],
        example: "/api/user/elonmusk/followers?count=50",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/user/{username}/liked",
        description: "Posts liked by an account",
        parameters: &[USERNAME, COUNT_100, PAGINATION],
        example: "/api/user/elonmusk/liked?count=20",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/user/{username}/mentions",
        description: "Posts mentioning an account",
        parameters: &[USERNAME, COUNT_100, PAGINATION],
        example: "/api/user/elonmusk/mentions?count=20",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/user/{username}/blocking",
        description: "Block list (requires OAuth 2.0 User Context, always fails)",
        parameters: &[USERNAME],
        example: "/api/user/elonmusk/blocking",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/user/{username}/muting",
        description: "Mute list (requires OAuth 2.0 User Context, always fails)",
        parameters: &[USERNAME],
        example: "/api/user/elonmusk/muting",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/users",
        description: "Accounts by id, up to 100 per request",
        parameters: &[("ids", "comma-separated account ids (required)")],
        example: "/api/users?ids=44196397,783214",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/users/{user_id}",
        description: "Account by id",
        parameters: &[("user_id", "account id")],
        example: "/api/users/44196397",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/users/by/username/{username}",
        description: "Account by handle",
        parameters: &[USERNAME],
        example: "/api/users/by/username/elonmusk",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/users/me",
        description: "Account owning the configured credential",
        parameters: &[],
        example: "/api/users/me",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/users/search",
        description: "Authors of recent posts matching a query",
        parameters: &[("q", "search query (required)"), COUNT_100],
        example: "/api/users/search?q=rustlang",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/users/reposts_of_me",
        description: "Reposts of your posts (requires OAuth 2.0 User Context, always fails)",
        parameters: &[],
        example: "/api/users/reposts_of_me",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/tweets",
        description: "Posts by id, up to 100 per request",
        parameters: &[("ids", "comma-separated post ids (required)")],
        example: "/api/tweets?ids=1460323737035677698",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/tweets/user/{username}",
        description: "Recent posts by an account",
        parameters: &[USERNAME, AUTHOR_COUNT, PAGINATION],
        example: "/api/tweets/user/elonmusk?count=20",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/tweets/search",
        description: "Recent posts matching a query (also at /api/tweets/search/recent)",
        parameters: &[("q", "search query (required)"), COUNT_100, PAGINATION],
        example: "/api/tweets/search?q=rustlang&count=20",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/tweets/counts/recent",
        description: "Post volume over time for a query",
        parameters: &[
            ("q", "search query (required)"),
            ("start_time", "RFC 3339 timestamp (optional)"),
            ("end_time", "RFC 3339 timestamp (optional)"),
        ],
        example: "/api/tweets/counts/recent?q=rustlang",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/tweets/{tweet_id}",
        description: "Post by id with its author",
        parameters: &[TWEET_ID],
        example: "/api/tweets/1460323737035677698",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/tweets/{tweet_id}/liking_users",
        description: "Accounts that liked a post",
        parameters: &[TWEET_ID, COUNT_100, PAGINATION],
        example: "/api/tweets/1460323737035677698/liking_users",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/tweets/{tweet_id}/quote_tweets",
        description: "Posts quoting a post",
        parameters: &[TWEET_ID, COUNT_100, PAGINATION],
        example: "/api/tweets/1460323737035677698/quote_tweets",
    },
    EndpointDoc {
        method: "GET",
        path: "/api/tweets/{tweet_id}/retweeted_by",
        description: "Accounts that reposted a post",
        parameters: &[TWEET_ID, COUNT_100, PAGINATION],
        example: "/api/tweets/1460323737035677698/retweeted_by",
    },
    EndpointDoc {
        method: "PUT",
        path: "/api/tweets/{tweet_id}/hidden",
        description: "Hide a reply (requires OAuth 2.0 User Context, always fails)",
        parameters: &[TWEET_ID, ("hidden", "true or false")],
        example: "/api/tweets/1460323737035677698/hidden?hidden=true",
    },
];

#[derive(Debug, Serialize)]
pub struct ApiDocs {
    pub title: &'static str,
    pub version: &'static str,
    pub endpoints: &'static [EndpointDoc],
}

/// Handles GET requests to `/api/docs`.
pub async fn handle_api_docs() -> Json<ApiDocs> {
    Json(ApiDocs {
        title: "X API Gateway",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS,
    })
}

/// Handles GET requests to the root `/` endpoint.
///
/// Renders the endpoint catalog as an HTML table with a link to each example.
pub async fn handle_root() -> Html<String> {
    let mut html = String::from(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>X API Gateway</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 0;
            padding: 20px;
            background-color: #f5f5f5;
        }
        .container {
            max-width: 1200px;
            margin: 0 auto;
            background-color: white;
            padding: 30px;
            border-radius: 8px;
        }
        table {
            width: 100%;
            border-collapse: collapse;
        }
        th, td {
            padding: 10px;
            text-align: left;
            border-bottom: 1px solid #ddd;
            vertical-align: top;
        }
        code {
            font-size: 0.9em;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>X API Gateway</h1>
        <table>
            <thead>
                <tr>
                    <th>method</th>
                    <th>path</th>
                    <th>description</th>
                    <th>parameters</th>
                </tr>
            </thead>
            <tbody>
"#,
    );

    for endpoint in ENDPOINTS {
        let params: Vec<String> = endpoint
            .parameters
            .iter()
            .map(|(name, desc)| format!("<code>{}</code>: {}", html_escape(name), html_escape(desc)))
            .collect();
        let path = if endpoint.method == "GET" {
            format!(
                "<a href=\"{}\"><code>{}</code></a>",
                html_escape(endpoint.example),
                html_escape(endpoint.path)
            )
        } else {
            format!("<code>{}</code>", html_escape(endpoint.path))
        };
        html.push_str(&format!(
            "                <tr>\n                    <td>{}</td>\n                    <td>{}</td>\n                    <td>{}</td>\n                    <td>{}</td>\n                </tr>\n",
            endpoint.method,
            path,
            html_escape(endpoint.description),
            params.join("<br>")
        ));
    }

    html.push_str(
        r#"            </tbody>
        </table>
    </div>
</body>
</html>"#,
    );

    Html(html)
}

/// Escapes HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
