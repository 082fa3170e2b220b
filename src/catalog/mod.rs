//! Client for the TMDB v3 catalog API.
//!
//! Handlers talk to the catalog through the [`CatalogApi`] trait so tests can
//! substitute a canned implementation. Every call is a single GET with the API
//! key appended; there is no caching and no retry.

mod enrich;
pub mod genres;

pub use enrich::{enrich_interactions, EnrichedTitle, TitleDetails};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::CatalogConfig;
use crate::db::MediaType;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("TMDB API key not configured")]
    NotConfigured,
    #[error("TMDB API error: {0}")]
    Status(u16),
    #[error("TMDB request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Trending period for `/trending`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

impl std::str::FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            _ => Err(format!("Unknown time window: {}", s)),
        }
    }
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Whether credentials are present. Calls fail with `NotConfigured` otherwise.
    fn is_configured(&self) -> bool;

    /// GET `path` (relative to the API root) with the given query parameters
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, CatalogError>;

    async fn trending(&self, window: TimeWindow, page: u32) -> Result<Value, CatalogError> {
        self.get_json(
            &format!("/trending/all/{}", window.as_str()),
            &[("page", page.to_string())],
        )
        .await
    }

    async fn popular(&self, media_type: MediaType, page: u32) -> Result<Value, CatalogError> {
        self.get_json(
            &format!("/{}/popular", media_type),
            &[("page", page.to_string())],
        )
        .await
    }

    async fn search_multi(&self, query: &str, page: u32) -> Result<Value, CatalogError> {
        self.get_json(
            "/search/multi",
            &[("query", query.to_string()), ("page", page.to_string())],
        )
        .await
    }

    async fn details(&self, media_type: MediaType, id: i64) -> Result<Value, CatalogError> {
        self.get_json(&format!("/{}/{}", media_type, id), &[]).await
    }

    async fn credits(&self, media_type: MediaType, id: i64) -> Result<Value, CatalogError> {
        self.get_json(
            &format!("/{}/{}/credits", media_type, id),
            &[("language", "en-US".to_string())],
        )
        .await
    }

    async fn recommendations(
        &self,
        media_type: MediaType,
        id: i64,
        page: u32,
    ) -> Result<Value, CatalogError> {
        self.get_json(
            &format!("/{}/{}/recommendations", media_type, id),
            &[("language", "en-US".to_string()), ("page", page.to_string())],
        )
        .await
    }
}

pub struct TmdbClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl CatalogApi for TmdbClient {
    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, CatalogError> {
        if !self.is_configured() {
            return Err(CatalogError::NotConfigured);
        }

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(path = %path, "Fetching from TMDB");

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(path = %path, status = %status, "TMDB returned an error status");
            return Err(CatalogError::Status(status.as_u16()));
        }

        Ok(response.json().await?)
    }
}

/// Build the shared catalog client
pub fn create_catalog(config: &CatalogConfig) -> Arc<dyn CatalogApi> {
    let client = TmdbClient::new(config);
    if !client.is_configured() {
        tracing::warn!("TMDB_API_KEY is not set; catalog routes will return errors");
    }
    Arc::new(client)
}
