//! Imcrate Server Binary
//!
//! Loads the collection, starts the resync driver and the RPC listeners, and
//! persists once more on Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use imcrate_core::{
    CatalogSource, SnapshotFileCatalog, SqliteStore, StaticCatalog, Syncer, SyncerConfig,
};
use imcrate_server::{resync, serve_until, socket, AppState};
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<SyncerConfig, Box<dyn std::error::Error>> {
    let mut config = match std::env::var("IMCRATE_CONFIG") {
        Ok(path) => SyncerConfig::load(&path)?,
        Err(_) => SyncerConfig::default(),
    };
    if let Ok(addr) = std::env::var("IMCRATE_ADDR") {
        config.server.addr = addr;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;

    let store = SqliteStore::open(&config.storage.db_path)?;
    tracing::info!("Using collection store at {:?}", config.storage.db_path);

    let source: Arc<dyn CatalogSource> = match &config.catalog.snapshot_path {
        Some(path) => {
            tracing::info!("Serving catalog export from {:?}", path);
            Arc::new(SnapshotFileCatalog::new(path))
        }
        None => {
            tracing::warn!("No catalog configured, using an empty in-memory catalog");
            Arc::new(StaticCatalog::new())
        }
    };

    let syncer = Syncer::from_config(&config.storage, Box::new(store), source)?;
    if let Ok(token) = std::env::var("IMCRATE_TOKEN") {
        syncer.store_token(&token)?;
    } else if syncer.load_token()?.is_none() {
        tracing::warn!("No catalog token stored; set IMCRATE_TOKEN to save one");
    }

    let addr = config.server.addr.clone();
    let socket_path = config.server.socket_path.clone();
    let resync_config = config.resync.clone();
    let state = Arc::new(AppState::new(syncer, config));

    let driver = if resync_config.enabled {
        Some(resync::spawn(
            Arc::clone(&state),
            Duration::from_secs(resync_config.interval_secs),
        ))
    } else {
        None
    };

    if let Some(path) = socket_path {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = socket::serve_unix_socket(path, state).await {
                tracing::error!("Unix socket server stopped: {}", e);
            }
        });
    }

    serve_until(&addr, Arc::clone(&state), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    if let Some(driver) = driver {
        driver.abort();
    }
    if let Err(e) = state.shutdown().await {
        tracing::error!("Final persist failed: {}", e);
    }
    Ok(())
}
