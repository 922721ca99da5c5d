//! Application initialization: config validation, database, storage,
//! state, routes.

pub mod database;
pub mod routes;
pub mod server;

use anyhow::{Context, Result};
use std::sync::Arc;
use vidplane_core::Config;
use vidplane_storage::LocalStorage;

use crate::state::AppState;

pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;
    tracing::info!("Configuration loaded and validated");

    let pool = database::setup_database(&config).await?;

    let storage = LocalStorage::new(config.storage_root.clone())
        .await
        .context("Failed to initialize storage")?;
    tracing::info!(storage_root = %config.storage_root, "Local storage initialized");

    let state = Arc::new(AppState::new(config.clone(), pool, Arc::new(storage)));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
