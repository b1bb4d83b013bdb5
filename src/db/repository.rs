//! Data access for users, posts and engagements.
//!
//! The feed and ingestion services depend on the traits here rather than on
//! Postgres directly, so they can run against any store that returns
//! consistent snapshots.
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};

use crate::{
    error::{AppError, AppResult},
    models::{
        metadata_from_json, metadata_to_json, Engagement, EngagementKind, NewEngagement, NewPost,
        Post, User, UserId,
    },
};

/// Read side used when building feeds
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FeedRepository: Send + Sync {
    /// Looks up a user by exact username
    async fn find_user(&self, username: &str) -> AppResult<Option<User>>;

    /// All engagements recorded for a user, oldest first
    async fn list_engagements(&self, user_id: UserId) -> AppResult<Vec<Engagement>>;

    /// Catalog posts, newest first
    async fn list_posts(&self, limit: i64, offset: i64) -> AppResult<Vec<Post>>;

    /// Catalog posts whose category equals `category`, newest first
    async fn list_posts_in_category(
        &self,
        category: &str,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Post>>;
}

/// Write side used by catalog ingestion
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Returns the user with this name, creating it if needed
    async fn upsert_user(&self, username: &str) -> AppResult<User>;

    /// Inserts a post, or updates the existing post with the same title
    async fn upsert_post(&self, post: &NewPost) -> AppResult<Post>;

    /// Records an engagement once per user, post and kind. Returns whether
    /// a row was written; a repeat only updates a changed rating score.
    async fn insert_engagement(&self, engagement: &NewEngagement) -> AppResult<bool>;
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PostRow {
    id: i64,
    title: String,
    category: Option<String>,
    metadata: Option<Json<serde_json::Value>>,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            title: row.title,
            category: row.category,
            metadata: row
                .metadata
                .map(|Json(value)| metadata_from_json(value))
                .unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct EngagementRow {
    id: i64,
    user_id: i64,
    post_id: i64,
    kind: String,
    rating_score: Option<i16>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EngagementRow> for Engagement {
    type Error = AppError;

    fn try_from(row: EngagementRow) -> Result<Self, Self::Error> {
        let kind: EngagementKind = row.kind.parse().map_err(AppError::Internal)?;
        Ok(Engagement {
            id: row.id,
            user_id: row.user_id,
            post_id: row.post_id,
            kind,
            rating_score: row.rating_score,
            created_at: row.created_at,
        })
    }
}

const POST_COLUMNS: &str = "id, title, category, metadata, created_at";

/// Postgres-backed repository
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FeedRepository for PgRepository {
    async fn find_user(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn list_engagements(&self, user_id: UserId) -> AppResult<Vec<Engagement>> {
        let rows = sqlx::query_as::<_, EngagementRow>(
            r#"
            SELECT id, user_id, post_id, kind, rating_score, created_at
            FROM engagements
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Engagement::try_from).collect()
    }

    async fn list_posts(&self, limit: i64, offset: i64) -> AppResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {} FROM posts ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            POST_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn list_posts_in_category(
        &self,
        category: &str,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            SELECT {} FROM posts
            WHERE category = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            POST_COLUMNS
        ))
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgRepository {
    async fn upsert_user(&self, username: &str) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username) VALUES ($1)
            ON CONFLICT (username) DO UPDATE SET username = EXCLUDED.username
            RETURNING id, username, created_at
            "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn upsert_post(&self, post: &NewPost) -> AppResult<Post> {
        let metadata = post.metadata.as_ref().map(|m| Json(metadata_to_json(m)));

        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            INSERT INTO posts (title, category, metadata)
            VALUES ($1, $2, $3)
            ON CONFLICT (title) DO UPDATE
            SET category = COALESCE(EXCLUDED.category, posts.category),
                metadata = COALESCE(EXCLUDED.metadata, posts.metadata)
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(&post.title)
        .bind(&post.category)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn insert_engagement(&self, engagement: &NewEngagement) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO engagements (user_id, post_id, kind, rating_score)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, post_id, kind) DO UPDATE
            SET rating_score = EXCLUDED.rating_score
            WHERE engagements.rating_score IS DISTINCT FROM EXCLUDED.rating_score
            "#,
        )
        .bind(engagement.user_id)
        .bind(engagement.post_id)
        .bind(engagement.kind.as_str())
        .bind(engagement.rating_score)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetadataValue;
    use serde_json::json;

    #[test]
    fn test_post_row_without_metadata() {
        let post = Post::from(PostRow {
            id: 3,
            title: "Sunrise".to_string(),
            category: None,
            metadata: None,
            created_at: Utc::now(),
        });

        assert_eq!(post.id, 3);
        assert!(post.metadata.is_empty());
    }

    #[test]
    fn test_post_row_with_metadata() {
        let post = Post::from(PostRow {
            id: 4,
            title: "Sunset".to_string(),
            category: Some("travel".to_string()),
            metadata: Some(Json(json!({"mood": "calm"}))),
            created_at: Utc::now(),
        });

        assert_eq!(post.metadata["mood"], MetadataValue::Text("calm".to_string()));
    }

    #[test]
    fn test_engagement_row_kind_parsed() {
        let engagement = Engagement::try_from(EngagementRow {
            id: 1,
            user_id: 2,
            post_id: 3,
            kind: "rating".to_string(),
            rating_score: Some(4),
            created_at: Utc::now(),
        })
        .unwrap();

        assert_eq!(engagement.kind, EngagementKind::Rating);
        assert_eq!(engagement.rating_score, Some(4));
    }

    #[test]
    fn test_engagement_row_unknown_kind_is_error() {
        let result = Engagement::try_from(EngagementRow {
            id: 1,
            user_id: 2,
            post_id: 3,
            kind: "share".to_string(),
            rating_score: None,
            created_at: Utc::now(),
        });

        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
