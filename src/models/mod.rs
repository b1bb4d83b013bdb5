use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod engagement;
pub mod metadata;
pub mod upstream;

pub use engagement::{Engagement, EngagementKind, NewEngagement, RATING_RANGE};
pub use metadata::{metadata_from_json, metadata_to_json, Metadata, MetadataValue};
pub use upstream::{UpstreamPost, UpstreamUser};

/// Identifier of a post in the catalog store
pub type PostId = i64;

/// Identifier of a user in the store
pub type UserId = i64;

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A content item (video post) in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub category: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

/// Post waiting to be written to the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub title: String,
    pub category: Option<String>,
    /// `None` leaves the metadata of an existing post untouched
    pub metadata: Option<Metadata>,
}

/// Why an entry ended up in a feed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedReason {
    ColdStart,
    Personalized,
    Category,
}

impl Display for FeedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedReason::ColdStart => write!(f, "cold_start"),
            FeedReason::Personalized => write!(f, "personalized"),
            FeedReason::Category => write!(f, "category"),
        }
    }
}

/// One item of a feed response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedEntry {
    pub id: PostId,
    pub title: String,
    pub category: Option<String>,
    pub metadata: Metadata,
    pub reason: FeedReason,
    /// Similarity score, rounded to 4 decimals; personalized entries only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl FeedEntry {
    pub fn new(post: &Post, reason: FeedReason) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            category: post.category.clone(),
            metadata: post.metadata.clone(),
            reason,
            score: None,
        }
    }

    pub fn personalized(post: &Post, score: f64) -> Self {
        Self {
            score: Some(round_score(score)),
            ..Self::new(post, FeedReason::Personalized)
        }
    }
}

/// Pagination window: skip `offset` results, then take up to `limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Window covering every result
    pub fn all() -> Self {
        Self::new(usize::MAX, 0)
    }

    /// Applies the window to an already ordered sequence
    pub fn apply<I: IntoIterator>(&self, items: I) -> Vec<I::Item> {
        items.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

/// Rounds a similarity score to 4 decimal places for presentation
pub fn round_score(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}
