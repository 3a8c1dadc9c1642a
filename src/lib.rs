pub mod api;
pub mod authorization;
pub mod config;
pub mod db;
pub mod sources;
pub mod timeline;

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::ServerError;
use crate::config::{AppConfig, ConfigError};
use crate::db::Store;
use crate::sources::{EventSource, ImagingSource, RegistrySource, SourceError, VitalsSource};
use crate::timeline::TimelineEngine;

/// Failures that stop the service before it can answer requests.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Server(#[from] ServerError),
}

pub async fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Clinical timeline starting v{}", config::APP_VERSION);

    let config = AppConfig::from_env()?;

    prepare_store(&config.registry_db, Store::Registry);
    prepare_store(&config.imaging_db, Store::Imaging);

    let sources: Vec<Arc<dyn EventSource>> = vec![
        Arc::new(RegistrySource::new(config.registry_db.clone())),
        Arc::new(ImagingSource::new(config.imaging_db.clone())),
        Arc::new(VitalsSource::new(&config.vitals_url, config.vitals_timeout)?),
    ];
    let engine = TimelineEngine::new(sources);

    let router = api::timeline_api_router(engine, &config.allowed_origins);
    let mut server = api::start_server(config.bind_addr, router).await?;
    tracing::info!(
        session_id = %server.session.session_id,
        addr = %server.session.server_addr,
        "Serving timeline API"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }
    server.shutdown();
    Ok(())
}

/// Create the store file and apply migrations up front. A store that cannot be
/// prepared is only logged: its source then reports itself unavailable per request.
fn prepare_store(path: &Path, store: Store) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!(path = %parent.display(), "Failed to create data directory: {e}");
            return;
        }
    }
    match db::open_database(path, store) {
        Ok(_) => tracing::debug!(path = %path.display(), ?store, "Store ready"),
        Err(e) => tracing::warn!(path = %path.display(), ?store, "Store not ready: {e}"),
    }
}
