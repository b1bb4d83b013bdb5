/// Socialverse content API provider
///
/// Lists users and the post catalog, and each user's viewed, liked, inspired
/// and rated posts.
///
/// API Flow:
/// 1. Users: /users/get_all?page=1&page_size=N
/// 2. Posts: /posts/summary/get?page=1&page_size=N
/// 3. Engagements: /users/{username}/{viewed|liked|inspired|rated}
///
/// Requests carry the `Flic-Token` header when a token is configured.
use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{EngagementKind, UpstreamPost, UpstreamUser},
    services::providers::{extract_records, parse_records, CatalogSource},
};
use reqwest::{header, Client as HttpClient, Url};
use std::time::Duration;

const TOKEN_HEADER: &str = "Flic-Token";

#[derive(Clone)]
pub struct SocialverseClient {
    http_client: HttpClient,
    api_url: Url,
    token: Option<String>,
    page_size: u32,
}

impl SocialverseClient {
    pub fn new(
        api_url: &str,
        token: Option<String>,
        page_size: u32,
        timeout: Duration,
    ) -> AppResult<Self> {
        let api_url = Url::parse(api_url)
            .map_err(|e| AppError::Internal(format!("Invalid upstream API URL: {}", e)))?;

        if api_url.cannot_be_a_base() {
            return Err(AppError::Internal(format!(
                "Upstream API URL cannot be a base: {}",
                api_url
            )));
        }

        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_url,
            token: token.filter(|t| !t.is_empty()),
            page_size,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            &config.api_base_url,
            config.flic_token.clone(),
            config.upstream_page_size,
            Duration::from_secs(config.upstream_timeout_secs),
        )
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Appends path segments to the base URL, escaping each one
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn engagement_segment(kind: EngagementKind) -> &'static str {
        match kind {
            EngagementKind::View => "viewed",
            EngagementKind::Like => "liked",
            EngagementKind::Inspire => "inspired",
            EngagementKind::Rating => "rated",
        }
    }

    /// Fetches a list endpoint and returns its raw records
    async fn get_records(&self, url: Url, paged: bool) -> AppResult<Vec<serde_json::Value>> {
        let mut request = self
            .http_client
            .get(url.clone())
            .header(header::ACCEPT, "application/json");

        if paged {
            request = request.query(&[("page", 1), ("page_size", self.page_size)]);
        }

        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Socialverse API returned status {} for {}: {}",
                status,
                url.path(),
                body
            )));
        }

        let body: serde_json::Value = response.json().await?;
        extract_records(body)
    }
}

#[async_trait::async_trait]
impl CatalogSource for SocialverseClient {
    #[tracing::instrument(skip(self))]
    async fn fetch_users(&self) -> AppResult<Vec<UpstreamUser>> {
        let records = self
            .get_records(self.endpoint(&["users", "get_all"]), true)
            .await?;
        tracing::debug!(count = records.len(), "Fetched upstream users");
        Ok(parse_records(records))
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_posts(&self) -> AppResult<Vec<UpstreamPost>> {
        let records = self
            .get_records(self.endpoint(&["posts", "summary", "get"]), true)
            .await?;
        tracing::debug!(count = records.len(), "Fetched upstream posts");
        Ok(parse_records(records))
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_engagements(
        &self,
        username: &str,
        kind: EngagementKind,
    ) -> AppResult<Vec<UpstreamPost>> {
        let url = self.endpoint(&["users", username, Self::engagement_segment(kind)]);
        let records = self.get_records(url, false).await?;
        Ok(parse_records(records))
    }

    fn name(&self) -> &'static str {
        "socialverse"
    }
}
