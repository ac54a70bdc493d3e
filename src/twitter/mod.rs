//! Twitter/X API integration module.
//!
//! This module contains the upstream transport, the API v2 payload shapes, and
//! their conversion into the gateway's canonical entities.

mod api;
mod convert;
pub mod wire;

pub use api::{ApiTransport, HttpTransport, QueryParams};

pub(crate) use convert::{accounts, count_bucket, posts};
