//! AWIRE DIGITAL catalog service
//!
//! Public catalog API plus the token-gated back-office: CRUD over the craft
//! catalog, media uploads, exports, statistics and the activity feed.

pub mod activity;
pub mod admin;
pub mod auth;
pub mod config;
pub mod contact;
pub mod export;
pub mod handlers;
pub mod media;
pub mod repository;
pub mod stats;
pub mod store;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use activity::{ActivityEvent, ActivityOutbox, ActivityWorker};
pub use config::{Config, StoreBackend};
pub use handlers::AppState;
pub use media::{CloudinaryUploader, MediaService, MediaUploader};
pub use repository::Catalog;
pub use store::{DocumentStore, MemoryStore, RedisStore};

/// Largest accepted upload form: the media cap plus room for the other fields
const UPLOAD_BODY_LIMIT: usize = 101 * 1024 * 1024;

fn admin_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/craft-items",
            get(admin::list_craft_items_handler).post(admin::create_craft_item_handler),
        )
        .route(
            "/craft-items/{id}",
            put(admin::update_craft_item_handler).delete(admin::delete_craft_item_handler),
        )
        .route(
            "/artisans",
            get(admin::list_artisans_handler).post(admin::create_artisan_handler),
        )
        .route(
            "/artisans/{id}",
            put(admin::update_artisan_handler).delete(admin::delete_artisan_handler),
        )
        .route(
            "/photos",
            get(admin::list_photos_handler).post(admin::create_photo_handler),
        )
        .route(
            "/photos/{id}",
            put(admin::update_photo_handler).delete(admin::delete_photo_handler),
        )
        .route("/categories", post(admin::create_category_handler))
        .route(
            "/categories/{id}",
            put(admin::update_category_handler).delete(admin::delete_category_handler),
        )
        .route("/villages", post(admin::create_village_handler))
        .route(
            "/villages/{id}",
            put(admin::update_village_handler).delete(admin::delete_village_handler),
        )
        .route("/site-config", put(admin::save_site_config_handler))
        .route("/activity", get(admin::activity_handler))
        .route("/statistics", get(admin::statistics_handler))
        .route(
            "/uploads",
            post(admin::upload_handler).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/exports/database", get(admin::database_export_handler))
        .route("/exports/{target}", get(admin::export_handler))
        .route_layer(middleware::from_fn_with_state(state, auth::require_admin))
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/craft-items", get(handlers::list_craft_items_handler))
        .route("/api/craft-items/{id}", get(handlers::get_craft_item_handler))
        .route("/api/artisans", get(handlers::list_artisans_handler))
        .route("/api/artisans/{id}", get(handlers::get_artisan_handler))
        .route(
            "/api/artisans/{id}/craft-items",
            get(handlers::artisan_craft_items_handler),
        )
        .route("/api/photos", get(handlers::list_photos_handler))
        .route("/api/categories", get(handlers::list_categories_handler))
        .route("/api/villages", get(handlers::list_villages_handler))
        .route("/api/site-config", get(handlers::get_site_config_handler))
        .nest("/api/admin", admin_router(shared_state.clone()))
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
