//! Public API request handlers

use awire_common::{
    Artisan, Category, CraftItem, Error, PageCursor, PageResponse, Photo, SiteConfig, Village,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::contact;
use crate::media::MediaService;
use crate::repository::Catalog;

/// Shared application state
pub struct AppState {
    pub catalog: Catalog,
    pub media: MediaService,

    /// Bearer token for `/api/admin`; without one every admin call is refused
    pub admin_token: Option<String>,

    pub page_size: usize,
    pub max_page_size: usize,
    pub activity_limit: usize,
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) | Error::InvalidCursor(_) => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Upload(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.to_string())
    }
}

/// Query of a paged listing
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

impl PageQuery {
    /// Effective page size and decoded cursor
    pub fn resolve(&self, state: &AppState) -> Result<(usize, Option<PageCursor>), ApiError> {
        let limit = self.limit.unwrap_or(state.page_size);
        if limit == 0 || limit > state.max_page_size {
            return Err(ApiError::bad_request(format!(
                "limit must be between 1 and {}",
                state.max_page_size
            )));
        }

        let cursor = match self.cursor.as_deref().filter(|c| !c.is_empty()) {
            Some(token) => Some(PageCursor::from_token(token)?),
            None => None,
        };
        Ok((limit, cursor))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CraftItemResponse {
    pub craft_item: CraftItem,
    /// WhatsApp link to ask the artisan about this item
    pub contact_link: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtisanResponse {
    pub artisan: Artisan,
    pub contact_link: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArtisansListResponse {
    pub artisans: Vec<Artisan>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CraftItemsListResponse {
    pub craft_items: Vec<CraftItem>,
    pub total: usize,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "catalog-service"
    }))
}

/// One newest-first page of the catalog
pub async fn list_craft_items_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<CraftItem>>, ApiError> {
    let (limit, cursor) = query.resolve(&state)?;
    debug!("Catalog page: limit={} cursor={:?}", limit, cursor);

    let items = state.catalog.craft_items_page(limit, cursor.as_ref()).await?;
    Ok(Json(PageResponse::new(items, limit)))
}

/// A craft item with its contact link
pub async fn get_craft_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CraftItemResponse>, ApiError> {
    let craft_item = state
        .catalog
        .craft_item(&id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Craft item not found: {}", id)))?;

    let whatsapp = state
        .catalog
        .artisan(&craft_item.artisan_id)
        .await
        .map(|artisan| artisan.whatsapp)
        .unwrap_or_default();
    let contact_link = contact::product_link(&whatsapp, &craft_item.name);

    Ok(Json(CraftItemResponse {
        craft_item,
        contact_link,
    }))
}

/// Artisans offered to visitors
pub async fn list_artisans_handler(State(state): State<Arc<AppState>>) -> Json<ArtisansListResponse> {
    let artisans = state.catalog.active_artisans().await;
    let total = artisans.len();
    Json(ArtisansListResponse { artisans, total })
}

/// Any artisan by id, active or not
pub async fn get_artisan_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ArtisanResponse>, ApiError> {
    let artisan = state
        .catalog
        .artisan(&id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Artisan not found: {}", id)))?;

    let contact_link = contact::profile_link(&artisan);
    Ok(Json(ArtisanResponse {
        artisan,
        contact_link,
    }))
}

pub async fn artisan_craft_items_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<CraftItemsListResponse> {
    let craft_items = state.catalog.craft_items_by_artisan(&id).await;
    let total = craft_items.len();
    Json(CraftItemsListResponse { craft_items, total })
}

/// Gallery page, newest first
pub async fn list_photos_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<Photo>>, ApiError> {
    let (limit, cursor) = query.resolve(&state)?;
    let photos = state.catalog.photos_page(limit, cursor.as_ref()).await?;
    Ok(Json(PageResponse::new(photos, limit)))
}

pub async fn list_categories_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Category>> {
    Json(state.catalog.categories().await)
}

pub async fn list_villages_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Village>> {
    Json(state.catalog.villages().await)
}

/// Site copy; empty texts until an admin saves them
pub async fn get_site_config_handler(State(state): State<Arc<AppState>>) -> Json<SiteConfig> {
    Json(state.catalog.site_config().await.unwrap_or_default())
}
