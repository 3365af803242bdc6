pub mod config;
pub mod controllers;
pub mod error;
pub mod models;
pub mod rules;
pub mod store;
pub mod upload;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::{Config, StoreBackend};
use crate::error::StartupError;
use crate::store::{MemoryStore, PgStore, Store};
use crate::upload::{BlobUploader, ImageUploader};

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub uploader: Arc<dyn ImageUploader>,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>, StartupError> {
        let store: Arc<dyn Store> = match config.app.store {
            StoreBackend::Postgres => {
                let store = PgStore::connect(&config.database).await?;
                info!("Database connected");
                store.run_migrations().await?;
                Arc::new(store)
            }
            StoreBackend::Memory => {
                warn!("Using the in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let uploader = Arc::new(BlobUploader::from_config(&config.blob)?);

        Ok(Self::with_parts(store, uploader, config))
    }

    pub fn with_parts(
        store: Arc<dyn Store>,
        uploader: Arc<dyn ImageUploader>,
        config: Config,
    ) -> Arc<Self> {
        Arc::new(Self { store, uploader, config })
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Venue Bookings API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
