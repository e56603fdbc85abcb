//! Catalog API client
//!
//! Talks to the public routes of the catalog service. The client is also a
//! [`PageSource`], so a [`awire_common::CatalogPager`] can page the catalog
//! over HTTP exactly as it pages a local store.

use anyhow::Context;
use async_trait::async_trait;
use awire_common::{
    Artisan, Category, CraftItem, PageCursor, PageResponse, PageSource, Photo, Result, SiteConfig,
    Village,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Client for the catalog service
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: String,
    client: reqwest::Client,
}

/// A craft item and the link for contacting its artisan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CraftItemDetail {
    pub craft_item: CraftItem,
    pub contact_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtisanProfile {
    pub artisan: Artisan,
    pub contact_link: String,
}

#[derive(Debug, Deserialize)]
struct ArtisansList {
    artisans: Vec<Artisan>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CraftItemsList {
    craft_items: Vec<CraftItem>,
}

impl CatalogClient {
    /// Create a new catalog client
    ///
    /// # Arguments
    /// * `base_url` - The URL of the catalog service (e.g., "http://localhost:8090")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("{} answered {}: {}", path, status, body).into());
        }

        let value = response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))?;
        Ok(Some(value))
    }

    async fn get_required<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_json(path, &[])
            .await?
            .ok_or_else(|| anyhow::anyhow!("{} not found", path).into())
    }

    fn page_query(limit: usize, after: Option<&PageCursor>) -> Vec<(&'static str, String)> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(cursor) = after {
            query.push(("cursor", cursor.to_token()));
        }
        query
    }

    /// One newest-first page of the catalog
    pub async fn craft_items_page(
        &self,
        limit: usize,
        after: Option<&PageCursor>,
    ) -> Result<PageResponse<CraftItem>> {
        self.get_json("/api/craft-items", &Self::page_query(limit, after))
            .await?
            .ok_or_else(|| anyhow::anyhow!("catalog listing not found").into())
    }

    pub async fn craft_item(&self, id: &str) -> Result<Option<CraftItemDetail>> {
        self.get_json(&format!("/api/craft-items/{}", id), &[]).await
    }

    /// Artisans shown to visitors
    pub async fn artisans(&self) -> Result<Vec<Artisan>> {
        let list: ArtisansList = self.get_required("/api/artisans").await?;
        Ok(list.artisans)
    }

    pub async fn artisan(&self, id: &str) -> Result<Option<ArtisanProfile>> {
        self.get_json(&format!("/api/artisans/{}", id), &[]).await
    }

    pub async fn artisan_craft_items(&self, artisan_id: &str) -> Result<Vec<CraftItem>> {
        let list: CraftItemsList = self
            .get_required(&format!("/api/artisans/{}/craft-items", artisan_id))
            .await?;
        Ok(list.craft_items)
    }

    /// One newest-first page of the gallery
    pub async fn photos_page(&self, limit: usize, after: Option<&PageCursor>) -> Result<PageResponse<Photo>> {
        self.get_json("/api/photos", &Self::page_query(limit, after))
            .await?
            .ok_or_else(|| anyhow::anyhow!("gallery listing not found").into())
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.get_required("/api/categories").await
    }

    pub async fn villages(&self) -> Result<Vec<Village>> {
        self.get_required("/api/villages").await
    }

    pub async fn site_config(&self) -> Result<SiteConfig> {
        self.get_required("/api/site-config").await
    }

    /// Health check for the catalog service
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach catalog service")?;

        Ok(response.status().is_success())
    }

    /// The gallery as a page source
    pub fn gallery(&self) -> Gallery {
        Gallery {
            client: self.clone(),
        }
    }
}

#[async_trait]
impl PageSource for CatalogClient {
    type Item = CraftItem;

    async fn fetch_page(&self, limit: usize, after: Option<&PageCursor>) -> Result<Vec<CraftItem>> {
        Ok(self.craft_items_page(limit, after).await?.items)
    }
}

/// Gallery photos, paged like the catalog
#[derive(Debug, Clone)]
pub struct Gallery {
    client: CatalogClient,
}

#[async_trait]
impl PageSource for Gallery {
    type Item = Photo;

    async fn fetch_page(&self, limit: usize, after: Option<&PageCursor>) -> Result<Vec<Photo>> {
        Ok(self.client.photos_page(limit, after).await?.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = CatalogClient::new("http://localhost:8090/");
        assert_eq!(client.base_url(), "http://localhost:8090");
    }

    #[test]
    fn test_page_query_carries_cursor_token() {
        let cursor = PageCursor::from_token("1718000000000000.abc").unwrap();
        let query = CatalogClient::page_query(12, Some(&cursor));
        assert_eq!(query[0], ("limit", "12".to_string()));
        assert_eq!(query[1], ("cursor", "1718000000000000.abc".to_string()));
    }
}
