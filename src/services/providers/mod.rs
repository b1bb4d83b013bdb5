/// Upstream catalog providers
///
/// A provider lists users and posts and each user's engagement history from a
/// remote content API. Ingestion only talks to the [`CatalogSource`] trait, so
/// another upstream can be plugged in without touching the sync logic.
use crate::{
    error::{AppError, AppResult},
    models::{EngagementKind, UpstreamPost, UpstreamUser},
};

pub mod socialverse;

pub use socialverse::SocialverseClient;

/// Trait for upstream catalog providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Every user known upstream
    async fn fetch_users(&self) -> AppResult<Vec<UpstreamUser>>;

    /// The upstream post catalog
    async fn fetch_posts(&self) -> AppResult<Vec<UpstreamPost>>;

    /// Posts a user engaged with in the given way
    async fn fetch_engagements(
        &self,
        username: &str,
        kind: EngagementKind,
    ) -> AppResult<Vec<UpstreamPost>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Field names under which list endpoints may wrap their records
const RECORD_FIELDS: [&str; 4] = ["users", "posts", "data", "results"];

/// Pulls the record array out of a list response.
///
/// Accepts a bare array or an object wrapping the array under one of
/// [`RECORD_FIELDS`]. A JSON `null` body counts as an empty list.
pub fn extract_records(body: serde_json::Value) -> AppResult<Vec<serde_json::Value>> {
    match body {
        serde_json::Value::Array(records) => Ok(records),
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Object(mut fields) => RECORD_FIELDS
            .iter()
            .find_map(|field| match fields.remove(*field) {
                Some(serde_json::Value::Array(records)) => Some(records),
                _ => None,
            })
            .ok_or_else(|| {
                AppError::ExternalApi("Upstream response has no record list".to_string())
            }),
        _ => Err(AppError::ExternalApi(
            "Invalid upstream response format".to_string(),
        )),
    }
}

/// Deserializes records, skipping the ones that do not match `T`
pub fn parse_records<T: serde::de::DeserializeOwned>(records: Vec<serde_json::Value>) -> Vec<T> {
    let total = records.len();
    let parsed: Vec<T> = records
        .into_iter()
        .filter_map(|record| serde_json::from_value(record).ok())
        .collect();

    if parsed.len() < total {
        tracing::warn!(
            skipped = total - parsed.len(),
            total,
            "Skipped malformed upstream records"
        );
    }

    parsed
}
