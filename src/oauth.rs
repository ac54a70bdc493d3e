//! OAuth authentication module for Twitter/X API integration.
//!
//! The gateway authenticates every upstream call with an OAuth 2.0 app-only
//! Bearer Token. Endpoints that need OAuth 2.0 User Context cannot be served
//! with this credential type and are rejected before any request is made.

/// Builds the Authorization header for OAuth 2.0 Bearer Token authentication.
///
/// # Format
///
/// ```text
/// Bearer YOUR_BEARER_TOKEN_HERE
/// ```
///
/// # Example
///
/// ```rust
/// use x_gateway::build_bearer_auth_header;
///
/// let header = build_bearer_auth_header("your_bearer_token");
/// assert_eq!(header, "Bearer your_bearer_token");
/// ```
pub fn build_bearer_auth_header(bearer_token: &str) -> String {
    format!("Bearer {}", bearer_token)
}

/// Human-readable name of the credential tier that app-only tokens lack.
pub const USER_CONTEXT_TIER: &str = "OAuth 2.0 User Context";
