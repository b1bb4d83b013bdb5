//! Catalog ingestion from the upstream content API

use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use crate::{
    db::CatalogStore,
    error::AppResult,
    models::{EngagementKind, NewEngagement, NewPost, UpstreamPost, User},
    services::providers::CatalogSource,
};

/// Counts of what one ingestion run wrote
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SyncReport {
    pub users: usize,
    pub posts: usize,
    /// Engagement rows newly written; re-synced ones are not counted
    pub engagements: usize,
    /// Users whose engagement history could not be fetched
    pub failed_users: usize,
}

pub struct SyncService {
    source: Arc<dyn CatalogSource>,
    store: Arc<dyn CatalogStore>,
}

impl SyncService {
    pub fn new(source: Arc<dyn CatalogSource>, store: Arc<dyn CatalogStore>) -> Self {
        Self { source, store }
    }

    /// Pulls users, posts and engagement histories into the store.
    ///
    /// Upstream failures listing users or posts abort the run. A failure
    /// fetching a single user's history is logged and counted instead.
    /// Store errors always abort.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn run(&self) -> AppResult<SyncReport> {
        let mut report = SyncReport::default();

        let upstream_users = self.source.fetch_users().await?;
        let mut users = Vec::with_capacity(upstream_users.len());
        for username in upstream_users
            .iter()
            .filter_map(|u| u.username.as_deref())
            .filter(|name| !name.trim().is_empty())
        {
            users.push(self.store.upsert_user(username).await?);
        }
        report.users = users.len();

        for post in self.source.fetch_posts().await? {
            self.store.upsert_post(&post.to_new_post()).await?;
            report.posts += 1;
        }

        tracing::info!(users = report.users, posts = report.posts, "Catalog synced");

        for user in &users {
            let result = self.sync_user(user, &mut report.engagements).await;
            match result {
                Ok(()) => {}
                Err(e) if e.is_upstream() => {
                    tracing::warn!(
                        username = %user.username,
                        error = %e,
                        "Failed to fetch engagement history, skipping user"
                    );
                    report.failed_users += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            engagements = report.engagements,
            failed_users = report.failed_users,
            "Sync finished"
        );

        Ok(report)
    }

    /// Ingests every engagement list of one user
    ///
    /// `stored` counts new engagement rows as they are written, so rows from
    /// lists fetched before a failure are still counted.
    async fn sync_user(&self, user: &User, stored: &mut usize) -> AppResult<()> {
        for kind in EngagementKind::ALL {
            let items = self.source.fetch_engagements(&user.username, kind).await?;

            for item in &items {
                let post = self.store.upsert_post(&referenced_post(item)).await?;
                let engagement = NewEngagement {
                    user_id: user.id,
                    post_id: post.id,
                    kind,
                    rating_score: rating_for(kind, item, &user.username),
                };
                if self.store.insert_engagement(&engagement).await? {
                    *stored += 1;
                }
            }
        }

        Ok(())
    }
}

/// Post named by an engagement item
///
/// Items without metadata leave the stored post's metadata alone.
fn referenced_post(item: &UpstreamPost) -> NewPost {
    NewPost {
        metadata: item.metadata.as_ref().map(|_| item.metadata()),
        ..item.to_new_post()
    }
}

fn rating_for(kind: EngagementKind, item: &UpstreamPost, username: &str) -> Option<i16> {
    if kind != EngagementKind::Rating {
        return None;
    }

    let score = item.rating_score();
    if score.is_none() && item.rating.as_ref().is_some_and(|r| !r.is_null()) {
        tracing::warn!(
            username,
            rating = ?item.rating,
            "Dropping rating outside 1..=5"
        );
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::repository::MockCatalogStore,
        error::AppError,
        models::{Metadata, Post, UpstreamUser},
        services::providers::MockCatalogSource,
    };
    use chrono::Utc;
    use serde_json::json;

    fn upstream_post(value: serde_json::Value) -> UpstreamPost {
        serde_json::from_value(value).unwrap()
    }

    fn stored_user(id: i64, username: &str) -> User {
        User {
            id,
            username: username.to_string(),
            created_at: Utc::now(),
        }
    }

    fn stored_post(id: i64, new_post: &NewPost) -> Post {
        Post {
            id,
            title: new_post.title.clone(),
            category: new_post.category.clone(),
            metadata: new_post.metadata.clone().unwrap_or_default(),
            created_at: Utc::now(),
        }
    }

    fn source_with_users(names: &[&str]) -> MockCatalogSource {
        let users: Vec<UpstreamUser> = names
            .iter()
            .map(|name| UpstreamUser {
                username: Some(name.to_string()),
            })
            .collect();

        let mut source = MockCatalogSource::new();
        source.expect_name().return_const("test");
        source
            .expect_fetch_users()
            .returning(move || Ok(users.clone()));
        source
    }

    fn accepting_store() -> MockCatalogStore {
        let mut store = MockCatalogStore::new();
        store
            .expect_upsert_user()
            .returning(|name| Ok(stored_user(name.len() as i64, name)));
        store
            .expect_upsert_post()
            .returning(|new_post| Ok(stored_post(1, new_post)));
        store
    }

    #[tokio::test]
    async fn test_sync_ingests_catalog_and_histories() {
        let mut source = source_with_users(&["alice"]);
        source.expect_fetch_posts().returning(|| {
            Ok(vec![
                upstream_post(json!({"title": "Calm", "category": "wellness"})),
                upstream_post(json!({"post_title": "Run"})),
            ])
        });
        source
            .expect_fetch_engagements()
            .returning(|_, kind| match kind {
                EngagementKind::Like => Ok(vec![upstream_post(json!({"title": "Calm"}))]),
                EngagementKind::Rating => {
                    Ok(vec![upstream_post(json!({"title": "Run", "rating": "5"}))])
                }
                _ => Ok(vec![]),
            });

        let mut store = accepting_store();
        store
            .expect_insert_engagement()
            .withf(|e| e.kind == EngagementKind::Like && e.rating_score.is_none())
            .times(1)
            .returning(|_| Ok(true));
        store
            .expect_insert_engagement()
            .withf(|e| e.kind == EngagementKind::Rating && e.rating_score == Some(5))
            .times(1)
            .returning(|_| Ok(true));

        let service = SyncService::new(Arc::new(source), Arc::new(store));
        let report = tokio_test::assert_ok!(service.run().await);

        assert_eq!(
            report,
            SyncReport {
                users: 1,
                posts: 2,
                engagements: 2,
                failed_users: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_blank_usernames_skipped() {
        let mut source = MockCatalogSource::new();
        source.expect_name().return_const("test");
        source.expect_fetch_users().returning(|| {
            Ok(vec![
                UpstreamUser { username: None },
                UpstreamUser {
                    username: Some("  ".to_string()),
                },
            ])
        });
        source.expect_fetch_posts().returning(|| Ok(vec![]));
        source.expect_fetch_engagements().never();

        let mut store = MockCatalogStore::new();
        store.expect_upsert_user().never();

        let service = SyncService::new(Arc::new(source), Arc::new(store));
        let report = service.run().await.unwrap();

        assert_eq!(report, SyncReport::default());
    }

    #[tokio::test]
    async fn test_user_history_failure_is_counted_not_fatal() {
        let mut source = source_with_users(&["alice", "bobby"]);
        source.expect_fetch_posts().returning(|| Ok(vec![]));
        source
            .expect_fetch_engagements()
            .withf(|username, _| username == "alice")
            .returning(|_, _| Err(AppError::ExternalApi("status 500".to_string())));
        source
            .expect_fetch_engagements()
            .withf(|username, kind| username == "bobby" && *kind == EngagementKind::View)
            .returning(|_, _| Ok(vec![upstream_post(json!({"title": "Calm"}))]));
        source
            .expect_fetch_engagements()
            .withf(|username, _| username == "bobby")
            .returning(|_, _| Ok(vec![]));

        let mut store = accepting_store();
        store.expect_insert_engagement().returning(|_| Ok(true));

        let service = SyncService::new(Arc::new(source), Arc::new(store));
        let report = service.run().await.unwrap();

        assert_eq!(report.users, 2);
        assert_eq!(report.engagements, 1);
        assert_eq!(report.failed_users, 1);
    }

    #[tokio::test]
    async fn test_store_failure_aborts_sync() {
        let mut source = source_with_users(&["alice"]);
        source.expect_fetch_posts().returning(|| Ok(vec![]));
        source
            .expect_fetch_engagements()
            .returning(|_, _| Ok(vec![upstream_post(json!({"title": "Calm"}))]));

        let mut store = accepting_store();
        store
            .expect_insert_engagement()
            .returning(|_| Err(AppError::Internal("disk full".to_string())));

        let service = SyncService::new(Arc::new(source), Arc::new(store));
        assert!(matches!(service.run().await, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_user_listing_failure_aborts_sync() {
        let mut source = MockCatalogSource::new();
        source.expect_name().return_const("test");
        source
            .expect_fetch_users()
            .returning(|| Err(AppError::ExternalApi("status 401".to_string())));

        let service = SyncService::new(Arc::new(source), Arc::new(MockCatalogStore::new()));
        assert!(matches!(service.run().await, Err(AppError::ExternalApi(_))));
    }

    #[tokio::test]
    async fn test_rows_stored_before_failure_are_counted() {
        let mut source = source_with_users(&["alice"]);
        source.expect_fetch_posts().returning(|| Ok(vec![]));
        source
            .expect_fetch_engagements()
            .withf(|_, kind| *kind == EngagementKind::View)
            .returning(|_, _| {
                Ok(vec![
                    upstream_post(json!({"title": "Calm"})),
                    upstream_post(json!({"title": "Run"})),
                ])
            });
        source
            .expect_fetch_engagements()
            .withf(|_, kind| *kind == EngagementKind::Like)
            .returning(|_, _| Err(AppError::ExternalApi("status 502".to_string())));

        let mut store = accepting_store();
        store
            .expect_insert_engagement()
            .times(2)
            .returning(|_| Ok(true));

        let service = SyncService::new(Arc::new(source), Arc::new(store));
        let report = service.run().await.unwrap();

        assert_eq!(report.engagements, 2);
        assert_eq!(report.failed_users, 1);
    }

    #[tokio::test]
    async fn test_existing_engagements_not_counted_again() {
        let mut source = source_with_users(&["alice"]);
        source.expect_fetch_posts().returning(|| Ok(vec![]));
        source
            .expect_fetch_engagements()
            .withf(|_, kind| *kind == EngagementKind::View)
            .returning(|_, _| Ok(vec![upstream_post(json!({"title": "Calm"}))]));
        source
            .expect_fetch_engagements()
            .returning(|_, _| Ok(vec![]));

        let mut store = accepting_store();
        store.expect_insert_engagement().returning(|_| Ok(false));

        let service = SyncService::new(Arc::new(source), Arc::new(store));
        let report = service.run().await.unwrap();

        assert_eq!(report.engagements, 0);
        assert_eq!(report.failed_users, 0);
    }

    #[test]
    fn test_out_of_range_rating_dropped() {
        let item = upstream_post(json!({"title": "Calm", "rating": 11}));
        assert_eq!(rating_for(EngagementKind::Rating, &item, "alice"), None);

        let item = upstream_post(json!({"title": "Calm", "rating": 2}));
        assert_eq!(rating_for(EngagementKind::Rating, &item, "alice"), Some(2));
        assert_eq!(rating_for(EngagementKind::Like, &item, "alice"), None);
    }

    #[test]
    fn test_referenced_post_keeps_stored_metadata_when_absent() {
        let bare = referenced_post(&upstream_post(json!({"title": "Calm"})));
        assert_eq!(bare.metadata, None);

        let tagged = referenced_post(&upstream_post(json!({"title": "Calm", "metadata": {}})));
        assert_eq!(tagged.metadata, Some(Metadata::new()));
    }
}
