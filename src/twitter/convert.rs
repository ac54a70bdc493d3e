//! Conversion of upstream payloads into canonical entities.

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::wire;
use crate::models::{
    Account, AccountMetrics, CountBucket, Entities, Hashtag, Link, Mention, Post, PostMetrics,
    Reference, ReferenceKind,
};

/// Parses an upstream RFC 3339 timestamp; unparsable values become `None`.
fn parse_timestamp(raw: Option<&str>, owner: &str) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            warn!("Failed to parse created_at '{}' for {}: {}", raw, owner, e);
            None
        }
    }
}

impl From<wire::User> for Account {
    fn from(user: wire::User) -> Self {
        let created_at = parse_timestamp(user.created_at.as_deref(), &user.id);
        Account {
            metrics: user.public_metrics.map(|pm| AccountMetrics {
                followers_count: pm.followers_count,
                following_count: pm.following_count,
                tweet_count: pm.tweet_count,
                listed_count: pm.listed_count,
            }),
            id: user.id,
            username: user.username,
            name: user.name,
            description: user.description,
            profile_image_url: user.profile_image_url,
            verified: user.verified,
            created_at,
        }
    }
}

impl From<wire::Tweet> for Post {
    fn from(tweet: wire::Tweet) -> Self {
        let created_at = parse_timestamp(tweet.created_at.as_deref(), &tweet.id);
        let referenced_tweets = tweet.referenced_tweets.map(|refs| {
            refs.into_iter()
                .filter_map(|r| match ReferenceKind::from_upstream(&r.kind) {
                    Some(_) if r.id.is_empty() => {
                        debug!("Dropping '{}' reference without an id", r.kind);
                        None
                    }
                    Some(kind) => Some(Reference { kind, id: r.id }),
                    None => {
                        debug!("Dropping reference of unknown type '{}'", r.kind);
                        None
                    }
                })
                .collect()
        });

        Post {
            id: tweet.id,
            text: tweet.text,
            author_id: tweet.author_id.filter(|id| !id.is_empty()),
            created_at,
            metrics: tweet.public_metrics.map(|pm| PostMetrics {
                retweet_count: pm.retweet_count,
                reply_count: pm.reply_count,
                like_count: pm.like_count,
                quote_count: pm.quote_count,
                view_count: pm.impression_count,
            }),
            entities: tweet.entities.map(Entities::from),
            referenced_tweets,
        }
    }
}

impl From<wire::TweetEntities> for Entities {
    fn from(entities: wire::TweetEntities) -> Self {
        Entities {
            hashtags: entities
                .hashtags
                .into_iter()
                .map(|h| Hashtag { tag: h.tag })
                .collect(),
            mentions: entities
                .mentions
                .into_iter()
                .map(|m| Mention {
                    username: m.username,
                    id: m.id,
                })
                .collect(),
            urls: entities
                .urls
                .into_iter()
                .map(|u| Link {
                    url: u.url,
                    expanded_url: u.expanded_url,
                    display_url: u.display_url,
                })
                .collect(),
        }
    }
}

/// Converts a count bucket; buckets with unparsable bounds are skipped.
pub(crate) fn count_bucket(data: wire::CountData) -> Option<CountBucket> {
    let start = parse_timestamp(Some(&data.start), "count bucket")?;
    let end = parse_timestamp(Some(&data.end), "count bucket")?;
    Some(CountBucket {
        start,
        end,
        tweet_count: data.tweet_count,
    })
}

pub(crate) fn accounts(users: Vec<wire::User>) -> Vec<Account> {
    users.into_iter().map(Account::from).collect()
}

pub(crate) fn posts(tweets: Vec<wire::Tweet>) -> Vec<Post> {
    tweets.into_iter().map(Post::from).collect()
}
