//! Imcrate Server - Collection syncer RPC server
//!
//! HTTP and Unix-socket front ends over one shared syncer, plus the
//! background resync driver.

pub mod http;
pub mod resync;
pub mod socket;

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use imcrate_core::{Syncer, SyncerConfig};

/// Shared application state
///
/// Every request and every resync pass holds the syncer lock for the whole
/// operation, so nothing ever observes a half-applied pass.
pub struct AppState {
    pub syncer: Mutex<Syncer>,
    pub config: SyncerConfig,
}

impl AppState {
    pub fn new(syncer: Syncer, config: SyncerConfig) -> Self {
        Self {
            syncer: Mutex::new(syncer),
            config,
        }
    }

    /// Persist the collection one last time
    pub async fn shutdown(&self) -> imcrate_core::Result<()> {
        let syncer = self.syncer.lock().await;
        syncer.shutdown()
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Collection endpoints
        .route("/collection", get(http::get_collection))
        .route("/collection/resync", post(http::resync))
        .route("/releases/{id}", get(http::get_release))
        .route("/releases/{id}/folder", put(http::add_to_folder))
        .route("/releases/{id}/rating", put(http::update_rating))
        .route(
            "/releases/{id}/metadata",
            get(http::get_metadata).put(http::update_metadata),
        )
        // Folder endpoints
        .route("/folders", get(http::get_folders).put(http::save_folders))
        .route("/folders/releases", post(http::releases_in_folders))
        // Query endpoints
        .route("/spend", get(http::get_spend))
        .route("/search", get(http::search))
        // Want-list endpoints
        .route("/wants", get(http::get_wantlist).post(http::add_want))
        .route("/wants/sync", post(http::sync_wantlist))
        .route("/wants/collapse", post(http::collapse_wantlist))
        .route("/wants/rebuild", post(http::rebuild_wantlist))
        .route(
            "/wants/{id}",
            put(http::edit_want).delete(http::delete_want),
        )
        // System endpoints
        .route("/status", get(http::get_status))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    serve_until(addr, state, std::future::pending()).await
}

/// Start the server and stop accepting connections once `shutdown` resolves
pub async fn serve_until(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Imcrate server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
