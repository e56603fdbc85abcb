//! AWIRE DIGITAL catalog service
//!
//! REST API for the public catalog and the admin back-office

use anyhow::{Context, Result};
use catalog_service::{
    create_router, ActivityOutbox, AppState, Catalog, CloudinaryUploader, Config, DocumentStore,
    MediaService, MemoryStore, RedisStore, StoreBackend,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting AWIRE DIGITAL catalog service");
    info!("Store backend: {:?}", config.store_backend);

    // Initialize storage
    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Redis => {
            info!("Redis URL: {}", config.redis_url);
            Arc::new(
                RedisStore::connect(&config.redis_url)
                    .await
                    .context("Failed to initialize storage")?,
            )
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; nothing survives a restart");
            Arc::new(MemoryStore::new())
        }
    };

    if config.admin_token.is_none() {
        warn!("ADMIN_TOKEN not set; admin routes will refuse every request");
    }

    // Activity log writer
    let (outbox, worker) = ActivityOutbox::channel(store.clone());
    tokio::spawn(worker.run());

    let uploader = CloudinaryUploader::new(
        config.media_upload_url.clone(),
        config.media_upload_preset.clone(),
    );

    // Create application state
    let state = AppState {
        catalog: Catalog::new(store, outbox),
        media: MediaService::new(Arc::new(uploader)),
        admin_token: config.admin_token.clone(),
        page_size: config.page_size,
        max_page_size: config.max_page_size(),
        activity_limit: config.activity_limit,
    };

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Catalog service running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
