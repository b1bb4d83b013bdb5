use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{StatusCode, Uri},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;
use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{FeedEntry, Page},
    services::{FeedQuery, SyncReport},
};

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=100;
const LIMIT_RANGE: std::ops::RangeInclusive<i64> = 1..=100;
const DEFAULT_LIMIT: i64 = 20;

/// Raw `/feed` query string
#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub username: Option<String>,
    pub project_code: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl FeedParams {
    /// Checks bounds and turns the parameters into a feed query
    pub fn validate(self) -> AppResult<FeedQuery> {
        let username = self
            .username
            .ok_or_else(|| AppError::InvalidInput("username is required".to_string()))?;
        if !USERNAME_LEN.contains(&username.chars().count()) {
            return Err(AppError::InvalidInput(format!(
                "username must be between {} and {} characters",
                USERNAME_LEN.start(),
                USERNAME_LEN.end()
            )));
        }

        if self.project_code.as_deref() == Some("") {
            return Err(AppError::InvalidInput(
                "project_code must not be empty".to_string(),
            ));
        }

        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if !LIMIT_RANGE.contains(&limit) {
            return Err(AppError::InvalidInput(format!(
                "limit must be between {} and {}",
                LIMIT_RANGE.start(),
                LIMIT_RANGE.end()
            )));
        }

        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::InvalidInput(
                "offset must be non-negative".to_string(),
            ));
        }

        Ok(FeedQuery {
            username,
            category: self.project_code,
            page: Page::new(limit as usize, offset as usize),
        })
    }
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Fallback for unmatched routes
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

/// Handler for the feed endpoint
pub async fn feed(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    params: Result<Query<FeedParams>, QueryRejection>,
) -> AppResult<Json<Vec<FeedEntry>>> {
    let Query(params) = params.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let query = params.validate()?;

    tracing::info!(
        request_id = %request_id,
        username = %query.username,
        category = ?query.category,
        limit = query.page.limit,
        offset = query.page.offset,
        "Feed request"
    );

    let entries = state.feed_service.feed(&query).await?;
    Ok(Json(entries))
}

/// Handler for the sync endpoint
pub async fn sync(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<SyncReport>> {
    tracing::info!(request_id = %request_id, "Sync requested");
    let report = state.sync_service.run().await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(
        username: Option<&str>,
        project_code: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> FeedParams {
        FeedParams {
            username: username.map(str::to_string),
            project_code: project_code.map(str::to_string),
            limit,
            offset,
        }
    }

    #[test]
    fn test_defaults_applied() {
        let query = params(Some("alice"), None, None, None).validate().unwrap();
        assert_eq!(query.username, "alice");
        assert_eq!(query.category, None);
        assert_eq!(query.page, Page::new(20, 0));
    }

    #[test]
    fn test_project_code_becomes_category() {
        let query = params(Some("alice"), Some("fitness"), Some(5), Some(10))
            .validate()
            .unwrap();
        assert_eq!(query.category.as_deref(), Some("fitness"));
        assert_eq!(query.page, Page::new(5, 10));
    }

    #[test]
    fn test_username_bounds() {
        assert!(params(None, None, None, None).validate().is_err());
        assert!(params(Some("ab"), None, None, None).validate().is_err());
        assert!(params(Some("abc"), None, None, None).validate().is_ok());
        assert!(params(Some(&"x".repeat(100)), None, None, None).validate().is_ok());
        assert!(params(Some(&"x".repeat(101)), None, None, None).validate().is_err());
    }

    #[test]
    fn test_limit_and_offset_bounds() {
        assert!(params(Some("alice"), None, Some(0), None).validate().is_err());
        assert!(params(Some("alice"), None, Some(1), None).validate().is_ok());
        assert!(params(Some("alice"), None, Some(100), None).validate().is_ok());
        assert!(params(Some("alice"), None, Some(101), None).validate().is_err());
        assert!(params(Some("alice"), None, None, Some(-1)).validate().is_err());
    }

    #[test]
    fn test_empty_project_code_rejected() {
        assert!(matches!(
            params(Some("alice"), Some(""), None, None).validate(),
            Err(AppError::InvalidInput(_))
        ));
    }
}
