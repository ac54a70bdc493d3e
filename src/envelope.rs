//! Response envelope construction.
//!
//! Upstream list endpoints report pagination in two shapes: timelines carry only
//! a forward cursor, other lists carry both cursors. Both are folded into the
//! single [`Meta`] shape here. Building an envelope never fails.

use crate::models::Meta;
use crate::twitter::wire::{PaginationMeta, TimelineMeta};

/// Upstream pagination metadata, whatever its shape.
pub trait UpstreamMeta {
    fn result_count(&self) -> Option<usize>;
    fn next_token(&self) -> Option<&str>;
    fn previous_token(&self) -> Option<&str> {
        None
    }
}

impl UpstreamMeta for TimelineMeta {
    fn result_count(&self) -> Option<usize> {
        self.result_count
    }

    fn next_token(&self) -> Option<&str> {
        self.next_token.as_deref()
    }
}

impl UpstreamMeta for PaginationMeta {
    fn result_count(&self) -> Option<usize> {
        self.result_count
    }

    fn next_token(&self) -> Option<&str> {
        self.next_token.as_deref()
    }

    fn previous_token(&self) -> Option<&str> {
        self.previous_token.as_deref()
    }
}

/// Builds [`Meta`] for a collection of `collection_len` items.
///
/// An upstream count is authoritative even when it disagrees with the
/// collection length; without one the length is used. Empty cursors are dropped.
pub fn build_meta<M: UpstreamMeta>(upstream: Option<&M>, collection_len: usize) -> Meta {
    let token = |t: Option<&str>| t.filter(|t| !t.is_empty()).map(String::from);
    match upstream {
        Some(meta) => Meta {
            result_count: meta.result_count().unwrap_or(collection_len),
            next_token: token(meta.next_token()),
            previous_token: token(meta.previous_token()),
        },
        None => count_only(collection_len),
    }
}

/// [`Meta`] for results that carry no upstream metadata at all.
pub fn count_only(collection_len: usize) -> Meta {
    Meta {
        result_count: collection_len,
        next_token: None,
        previous_token: None,
    }
}
