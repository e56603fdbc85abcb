//! Admin API request handlers
//!
//! Every route here sits behind [`crate::auth::require_admin`]. Mutations
//! answer with the uniform `{success, id?, error?}` body: 400 when the
//! payload fails validation, 500 when the store call failed.

use awire_common::{
    ActivityLogEntry, Artisan, ArtisanUpdate, CraftItemUpdate, Error, MutationResult, NewArtisan,
    NewCraftItem, NewPhoto, Photo, PhotoUpdate, SiteConfig,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::export::{self, DatabaseExport, ExportTarget, REPORT_ROWS_PER_PAGE};
use crate::handlers::{ApiError, AppState, CraftItemsListResponse};
use crate::media::{UploadFile, UploadProfile, UploadResult};
use crate::stats::Statistics;

type MutationResponse = (StatusCode, Json<MutationResult>);

fn respond(result: MutationResult, on_success: StatusCode) -> MutationResponse {
    let status = if result.success {
        on_success
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(result))
}

fn rejected(err: Error) -> MutationResponse {
    debug!("Rejected admin payload: {}", err);
    (StatusCode::BAD_REQUEST, Json(MutationResult::failed(err)))
}

/// Body of category and village writes
#[derive(Debug, Deserialize)]
pub struct NameRequest {
    #[serde(rename = "nome")]
    pub name: String,
}

impl NameRequest {
    fn validate(&self) -> Result<&str, Error> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::validation("nome is required"));
        }
        Ok(name)
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminArtisansResponse {
    pub artisans: Vec<Artisan>,
    pub total: usize,
}

// ===== Craft items =====

pub async fn list_craft_items_handler(State(state): State<Arc<AppState>>) -> Json<CraftItemsListResponse> {
    let craft_items = state.catalog.craft_items().await;
    let total = craft_items.len();
    Json(CraftItemsListResponse { craft_items, total })
}

/// The artisan's current name; craft items never carry a client-supplied one
async fn resolve_artisan_name(state: &AppState, artisan_id: &str) -> Result<String, Error> {
    state
        .catalog
        .artisan(artisan_id)
        .await
        .map(|artisan| artisan.name)
        .ok_or_else(|| Error::validation(format!("artisan {} does not exist", artisan_id)))
}

pub async fn create_craft_item_handler(
    State(state): State<Arc<AppState>>,
    Json(mut payload): Json<NewCraftItem>,
) -> MutationResponse {
    if let Err(e) = payload.validate() {
        return rejected(e);
    }
    match resolve_artisan_name(&state, &payload.artisan_id).await {
        Ok(name) => payload.artisan_name = name,
        Err(e) => return rejected(e),
    }

    info!("Creating craft item: {}", payload.name);
    respond(state.catalog.add_craft_item(&payload).await, StatusCode::CREATED)
}

pub async fn update_craft_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut payload): Json<CraftItemUpdate>,
) -> MutationResponse {
    if let Err(e) = payload.validate() {
        return rejected(e);
    }
    payload.artisan_name = match payload.artisan_id.clone() {
        Some(artisan_id) => match resolve_artisan_name(&state, &artisan_id).await {
            Ok(name) => Some(name),
            Err(e) => return rejected(e),
        },
        None => None,
    };

    info!("Updating craft item: {}", id);
    respond(state.catalog.update_craft_item(&id, &payload).await, StatusCode::OK)
}

pub async fn delete_craft_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> MutationResponse {
    info!("Deleting craft item: {}", id);
    respond(state.catalog.delete_craft_item(&id).await, StatusCode::OK)
}

// ===== Artisans =====

/// Every artisan, inactive ones included
pub async fn list_artisans_handler(State(state): State<Arc<AppState>>) -> Json<AdminArtisansResponse> {
    let artisans = state.catalog.artisans().await;
    let total = artisans.len();
    Json(AdminArtisansResponse { artisans, total })
}

pub async fn create_artisan_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewArtisan>,
) -> MutationResponse {
    if let Err(e) = payload.validate() {
        return rejected(e);
    }

    info!("Creating artisan: {}", payload.name);
    respond(state.catalog.add_artisan(&payload).await, StatusCode::CREATED)
}

/// Renames are copied onto the artisan's craft items
pub async fn update_artisan_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ArtisanUpdate>,
) -> MutationResponse {
    if let Err(e) = payload.validate() {
        return rejected(e);
    }

    info!("Updating artisan: {}", id);
    respond(state.catalog.update_artisan(&id, &payload).await, StatusCode::OK)
}

pub async fn delete_artisan_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> MutationResponse {
    info!("Deleting artisan: {}", id);
    respond(state.catalog.delete_artisan(&id).await, StatusCode::OK)
}

// ===== Photos =====

pub async fn list_photos_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Photo>> {
    Json(state.catalog.photos().await)
}

pub async fn create_photo_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewPhoto>,
) -> MutationResponse {
    if let Err(e) = payload.validate() {
        return rejected(e);
    }
    respond(state.catalog.add_photo(&payload).await, StatusCode::CREATED)
}

pub async fn update_photo_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<PhotoUpdate>,
) -> MutationResponse {
    if payload.image_url.as_deref().is_some_and(|url| url.trim().is_empty()) {
        return rejected(Error::validation("imageUrl cannot be empty"));
    }
    respond(state.catalog.update_photo(&id, &payload).await, StatusCode::OK)
}

pub async fn delete_photo_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> MutationResponse {
    respond(state.catalog.delete_photo(&id).await, StatusCode::OK)
}

// ===== Categories and villages =====

pub async fn create_category_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NameRequest>,
) -> MutationResponse {
    match payload.validate() {
        Ok(name) => respond(state.catalog.add_category(name).await, StatusCode::CREATED),
        Err(e) => rejected(e),
    }
}

pub async fn update_category_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<NameRequest>,
) -> MutationResponse {
    match payload.validate() {
        Ok(name) => respond(state.catalog.update_category(&id, name).await, StatusCode::OK),
        Err(e) => rejected(e),
    }
}

pub async fn delete_category_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> MutationResponse {
    respond(state.catalog.delete_category(&id).await, StatusCode::OK)
}

pub async fn create_village_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NameRequest>,
) -> MutationResponse {
    match payload.validate() {
        Ok(name) => respond(state.catalog.add_village(name).await, StatusCode::CREATED),
        Err(e) => rejected(e),
    }
}

pub async fn update_village_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<NameRequest>,
) -> MutationResponse {
    match payload.validate() {
        Ok(name) => respond(state.catalog.update_village(&id, name).await, StatusCode::OK),
        Err(e) => rejected(e),
    }
}

pub async fn delete_village_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> MutationResponse {
    respond(state.catalog.delete_village(&id).await, StatusCode::OK)
}

// ===== Site config, activity, statistics =====

pub async fn save_site_config_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SiteConfig>,
) -> MutationResponse {
    respond(state.catalog.save_site_config(&payload).await, StatusCode::OK)
}

pub async fn activity_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActivityQuery>,
) -> Json<Vec<ActivityLogEntry>> {
    let limit = query
        .limit
        .unwrap_or(state.activity_limit)
        .clamp(1, state.max_page_size);
    Json(state.catalog.recent_activity(limit).await)
}

pub async fn statistics_handler(State(state): State<Arc<AppState>>) -> Json<Statistics> {
    Json(Statistics::collect(&state.catalog).await)
}

// ===== Uploads =====

fn form_error(err: impl std::fmt::Display) -> ApiError {
    ApiError::bad_request(format!("Invalid upload form: {}", err))
}

/// Multipart form: `file`, optional `profile` (document or media, default
/// media), `folder`, and comma-separated `tags`
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResult>), ApiError> {
    let mut file = None;
    let mut profile = UploadProfile::Media;
    let mut folder: Option<String> = None;
    let mut tags: Vec<String> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(form_error)?;
                file = Some(UploadFile::new(file_name, content_type, data.to_vec()));
            }
            "profile" => {
                let value = field.text().await.map_err(form_error)?;
                profile = UploadProfile::parse(&value)
                    .ok_or_else(|| ApiError::bad_request(format!("Unknown upload profile: {}", value)))?;
            }
            "folder" => folder = Some(field.text().await.map_err(form_error)?),
            "tags" => {
                tags = field
                    .text()
                    .await
                    .map_err(form_error)?
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            other => debug!("Ignoring upload form field: {}", other),
        }
    }

    let file = file.ok_or_else(|| ApiError::bad_request("Missing file field"))?;

    let result = state
        .media
        .upload(profile, &file, folder.as_deref(), &tags)
        .await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(Error::Validation(_)) => StatusCode::BAD_REQUEST,
        Err(_) => StatusCode::BAD_GATEWAY,
    };
    Ok((status, Json(UploadResult::from(result))))
}

// ===== Exports =====

fn attachment(content_type: &str, file_name: String, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response()
}

/// `format=csv` (default) or `format=report`
pub async fn export_handler(
    State(state): State<Arc<AppState>>,
    Path(target): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let target = ExportTarget::parse(&target)
        .ok_or_else(|| ApiError::not_found(format!("Unknown export: {}", target)))?;
    let table = target.table(&state.catalog).await;
    info!("Exporting {} rows of {:?}", table.rows.len(), target);

    match query.format.as_deref().unwrap_or("csv") {
        "csv" => Ok(attachment(
            "text/csv; charset=utf-8",
            format!("{}.csv", target.file_stem()),
            export::to_csv(&table),
        )),
        "report" => Ok(attachment(
            "text/plain; charset=utf-8",
            format!("{}.txt", target.file_stem()),
            export::render_report(target.report_title(), &table, Utc::now(), REPORT_ROWS_PER_PAGE),
        )),
        other => Err(ApiError::bad_request(format!("Unknown export format: {}", other))),
    }
}

/// Everything in one JSON document
pub async fn database_export_handler(State(state): State<Arc<AppState>>) -> Response {
    let dump = DatabaseExport::collect(&state.catalog).await;
    let file_name = format!("awire_backup_{}.json", dump.export_date.format("%Y-%m-%d"));

    (
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        )],
        Json(dump),
    )
        .into_response()
}
