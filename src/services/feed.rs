//! Feed assembly.
//!
//! Every request picks exactly one mode, re-evaluated from scratch each time:
//! - a category filter serves that category, newest first, uncached;
//! - otherwise a user with resolvable engagement history gets a personalized
//!   ranking of unseen posts;
//! - everyone else (unknown users, empty or unresolvable history, or nothing
//!   left unseen) gets the cold-start catalog, newest first.
//!
//! Personalized rankings are cached whole per username and re-sliced per
//! request. Cold-start pages come straight from the store, so they reach past
//! the ranking catalog's scan limit.
use std::{collections::HashMap, sync::Arc};

use tracing::instrument;

use crate::{
    cached,
    config::Config,
    db::{Cache, CacheKey, FeedRepository},
    error::AppResult,
    models::{FeedEntry, FeedReason, Page, Post, PostId},
    services::{preference::aggregate, ranking::Ranker},
};

/// Tunables for feed assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSettings {
    /// Maximum number of posts loaded as the ranking catalog
    pub catalog_scan_limit: i64,
    /// Lifetime of a cached feed in seconds
    pub cache_ttl_secs: u64,
}

impl From<&Config> for FeedSettings {
    fn from(config: &Config) -> Self {
        Self {
            catalog_scan_limit: config.catalog_scan_limit,
            cache_ttl_secs: config.feed_cache_ttl_secs,
        }
    }
}

/// A validated feed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub username: String,
    pub category: Option<String>,
    pub page: Page,
}

pub struct FeedService {
    repository: Arc<dyn FeedRepository>,
    ranker: Arc<dyn Ranker>,
    cache: Option<Cache>,
    settings: FeedSettings,
}

impl FeedService {
    pub fn new(
        repository: Arc<dyn FeedRepository>,
        ranker: Arc<dyn Ranker>,
        cache: Option<Cache>,
        settings: FeedSettings,
    ) -> Self {
        Self {
            repository,
            ranker,
            cache,
            settings,
        }
    }

    /// Builds one page of feed for a request
    #[instrument(
        skip(self, query),
        fields(username = %query.username, category = ?query.category)
    )]
    pub async fn feed(&self, query: &FeedQuery) -> AppResult<Vec<FeedEntry>> {
        if let Some(category) = query.category.as_deref() {
            return self.category_feed(category, query.page).await;
        }

        let personalized: Option<Vec<FeedEntry>> = cached!(
            self.cache.as_ref(),
            CacheKey::Feed(query.username.clone()),
            self.settings.cache_ttl_secs,
            self.personalized_feed(&query.username)
        )?;

        match personalized {
            Some(feed) => Ok(query.page.apply(feed)),
            None => self.cold_start(query.page).await,
        }
    }

    /// Posts in a category, newest first, without personalization
    pub async fn category_feed(&self, category: &str, page: Page) -> AppResult<Vec<FeedEntry>> {
        if page.limit == 0 {
            return Ok(Vec::new());
        }

        let posts = self
            .repository
            .list_posts_in_category(category, to_sql_bound(page.limit), to_sql_bound(page.offset))
            .await?;

        tracing::info!(mode = %FeedReason::Category, count = posts.len(), "Feed assembled");

        Ok(posts
            .iter()
            .map(|post| FeedEntry::new(post, FeedReason::Category))
            .collect())
    }

    /// Full, unpaginated personalized ranking for a user, or `None` when the
    /// user should get the cold-start catalog instead
    async fn personalized_feed(&self, username: &str) -> AppResult<Option<Vec<FeedEntry>>> {
        let Some(user) = self.repository.find_user(username).await? else {
            tracing::debug!("Unknown user");
            return Ok(None);
        };

        let engagements = self.repository.list_engagements(user.id).await?;
        if engagements.is_empty() {
            tracing::debug!(user_id = user.id, "No engagement history");
            return Ok(None);
        }

        let catalog = self
            .repository
            .list_posts(self.settings.catalog_scan_limit, 0)
            .await?;

        let by_id: HashMap<PostId, &Post> = catalog.iter().map(|post| (post.id, post)).collect();
        let preference = aggregate(&engagements, |id| by_id.get(&id).copied());

        if preference.is_cold() {
            tracing::debug!(
                user_id = user.id,
                engagements = engagements.len(),
                "No engagement resolves to a catalog post"
            );
            return Ok(None);
        }

        let ranked = self.ranker.rank(&preference, &catalog, Page::all());
        if ranked.is_empty() {
            tracing::debug!(user_id = user.id, "Every catalog post already seen");
            return Ok(None);
        }

        tracing::info!(
            mode = %FeedReason::Personalized,
            ranker = self.ranker.name(),
            engagements = engagements.len(),
            resolved = preference.resolved,
            features = preference.vector.len(),
            candidates = ranked.len(),
            "Feed assembled"
        );

        Ok(Some(
            ranked
                .iter()
                .map(|candidate| FeedEntry::personalized(candidate.post, candidate.score))
                .collect(),
        ))
    }

    /// One page of the whole catalog, newest first
    async fn cold_start(&self, page: Page) -> AppResult<Vec<FeedEntry>> {
        if page.limit == 0 {
            return Ok(Vec::new());
        }

        let posts = self
            .repository
            .list_posts(to_sql_bound(page.limit), to_sql_bound(page.offset))
            .await?;

        tracing::info!(mode = %FeedReason::ColdStart, count = posts.len(), "Feed assembled");

        Ok(posts
            .iter()
            .map(|post| FeedEntry::new(post, FeedReason::ColdStart))
            .collect())
    }
}

fn to_sql_bound(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
