//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use imcrate_core::{
    CollectionView, ErrorKind, Folder, FolderSelector, MetadataPatch, Release, ReleaseMetadata,
    ResyncReport, SpendReport, SyncError, SyncStatus, Want, WantPatch, WantSyncReport,
};

use crate::AppState;

/// Error returned by every fallible handler
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// HTTP status for each error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::UpstreamFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::PersistenceFailure | ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ApiError::Sync(e) => (status_for(e.kind()), e.kind().name()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorBody {
            error: kind.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ==================== Collection ====================

/// Run a full resync pass now
pub async fn resync(State(state): State<Arc<AppState>>) -> ApiResult<ResyncReport> {
    let mut syncer = state.syncer.lock().await;
    Ok(Json(syncer.resync()?))
}

/// Owned releases with folders attached
pub async fn get_collection(State(state): State<Arc<AppState>>) -> Json<CollectionView> {
    let syncer = state.syncer.lock().await;
    Json(syncer.get_collection())
}

/// Request for releases in a set of folders
#[derive(Debug, Deserialize)]
pub struct FolderReleasesRequest {
    pub selectors: Vec<FolderSelector>,
}

pub async fn releases_in_folders(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FolderReleasesRequest>,
) -> ApiResult<Vec<Release>> {
    let syncer = state.syncer.lock().await;
    Ok(Json(syncer.releases_in_folders(&request.selectors)?))
}

/// Get a single release, or a stand-in for a wanted one
pub async fn get_release(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> ApiResult<Release> {
    let mut syncer = state.syncer.lock().await;
    Ok(Json(syncer.single_release(id)?))
}

/// Request to move a release into a folder
#[derive(Debug, Deserialize)]
pub struct AddToFolderRequest {
    pub folder_id: i32,
}

pub async fn add_to_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(request): Json<AddToFolderRequest>,
) -> ApiResult<Release> {
    let mut syncer = state.syncer.lock().await;
    Ok(Json(syncer.add_to_folder(id, request.folder_id)?))
}

/// Request to rate a release
#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i32,
}

pub async fn update_rating(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(request): Json<RatingRequest>,
) -> ApiResult<Release> {
    let mut syncer = state.syncer.lock().await;
    Ok(Json(syncer.update_rating(id, request.rating)?))
}

// ==================== Metadata ====================

pub async fn get_metadata(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> ApiResult<ReleaseMetadata> {
    let syncer = state.syncer.lock().await;
    Ok(Json(syncer.metadata(id)?))
}

pub async fn update_metadata(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(patch): Json<MetadataPatch>,
) -> ApiResult<ReleaseMetadata> {
    let mut syncer = state.syncer.lock().await;
    Ok(Json(syncer.update_metadata(id, &patch)?))
}

/// Query parameters for spend reports
#[derive(Debug, Deserialize)]
pub struct SpendQuery {
    pub year: i32,
    pub month: Option<u32>,
}

/// Total spend for a year, or one month of it
pub async fn get_spend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SpendQuery>,
) -> ApiResult<SpendReport> {
    if query.month.is_some_and(|m| m > 12) {
        return Err(ApiError::BadRequest("month must be 0-12".to_string()));
    }
    let syncer = state.syncer.lock().await;
    Ok(Json(syncer.spend(query.month, query.year)))
}

/// Query parameters for title search
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<Release>> {
    let syncer = state.syncer.lock().await;
    Json(syncer.search(&query.q))
}

// ==================== Want-list ====================

pub async fn get_wantlist(State(state): State<Arc<AppState>>) -> Json<Vec<Want>> {
    let syncer = state.syncer.lock().await;
    Json(syncer.wantlist())
}

pub async fn sync_wantlist(State(state): State<Arc<AppState>>) -> ApiResult<WantSyncReport> {
    let mut syncer = state.syncer.lock().await;
    Ok(Json(syncer.sync_wantlist()?))
}

/// Request to want a release
#[derive(Debug, Deserialize)]
pub struct AddWantRequest {
    pub release_id: i32,
}

pub async fn add_want(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddWantRequest>,
) -> ApiResult<Want> {
    let mut syncer = state.syncer.lock().await;
    Ok(Json(syncer.add_want(request.release_id)?))
}

pub async fn edit_want(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(patch): Json<WantPatch>,
) -> ApiResult<Want> {
    let mut syncer = state.syncer.lock().await;
    Ok(Json(syncer.edit_want(id, &patch)?))
}

pub async fn delete_want(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> ApiResult<Want> {
    let mut syncer = state.syncer.lock().await;
    Ok(Json(syncer.delete_want(id)?))
}

/// Deactivate every unpinned want
pub async fn collapse_wantlist(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Want>> {
    let mut syncer = state.syncer.lock().await;
    Ok(Json(syncer.collapse_wantlist()?))
}

/// Reactivate every want
pub async fn rebuild_wantlist(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Want>> {
    let mut syncer = state.syncer.lock().await;
    Ok(Json(syncer.rebuild_wantlist()?))
}

// ==================== Folders ====================

pub async fn save_folders(
    State(state): State<Arc<AppState>>,
    Json(folders): Json<Vec<Folder>>,
) -> ApiResult<Vec<Folder>> {
    let mut syncer = state.syncer.lock().await;
    Ok(Json(syncer.save_folders(&folders)?))
}

pub async fn get_folders(State(state): State<Arc<AppState>>) -> Json<Vec<Folder>> {
    let syncer = state.syncer.lock().await;
    Json(syncer.folders())
}

/// Get server status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<SyncStatus> {
    let syncer = state.syncer.lock().await;
    Json(syncer.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use imcrate_core::{MemoryStore, StaticCatalog, Syncer, SyncerConfig};
    use tower::ServiceExt;

    use crate::create_router;

    fn state(catalog: &StaticCatalog) -> Arc<AppState> {
        let syncer = Syncer::load(Box::new(MemoryStore::new()), Arc::new(catalog.clone())).unwrap();
        Arc::new(AppState::new(syncer, SyncerConfig::default()))
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_folders(vec![Folder::new(23, "Testing"), Folder::new(25, "TestingTwo")])
            .with_releases(vec![
                Release::new(25, "Spiderland").in_folder(23),
                Release::new(32, "FutureWorld").in_folder(23),
            ])
            .with_wants(vec![Release::stub(77)])
    }

    async fn send(state: &Arc<AppState>, method: &str, uri: &str, body: Option<&str>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        create_router(Arc::clone(state)).oneshot(request).await.unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_resync_then_collection() {
        let state = state(&catalog());
        let response = send(&state, "POST", "/collection/resync", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let report: ResyncReport = json_body(response).await;
        assert_eq!(report.releases, 2);

        let response = send(&state, "GET", "/collection", None).await;
        let view: CollectionView = json_body(response).await;
        assert_eq!(view.releases.len(), 2);
        assert_eq!(view.folders.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_release_is_404() {
        let state = state(&catalog());
        let response = send(&state, "GET", "/releases/999", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: ErrorBody = json_body(response).await;
        assert_eq!(body.error, "not_found");
    }

    #[tokio::test]
    async fn test_unknown_want_delete_is_409() {
        let state = state(&catalog());
        let response = send(&state, "DELETE", "/wants/12", None).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_offline_catalog_is_502() {
        let catalog = catalog();
        let state = state(&catalog);
        catalog.set_offline(true);
        let response = send(&state, "POST", "/wants/sync", None).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: ErrorBody = json_body(response).await;
        assert_eq!(body.error, "upstream_failure");
    }

    #[tokio::test]
    async fn test_rating_and_metadata() {
        let state = state(&catalog());
        send(&state, "POST", "/collection/resync", None).await;

        let response = send(&state, "PUT", "/releases/25/rating", Some(r#"{"rating": 4}"#)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let release: Release = json_body(response).await;
        assert_eq!(release.rating, 4);

        let response = send(&state, "PUT", "/releases/25/rating", Some(r#"{"rating": 9}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = json_body(response).await;
        assert_eq!(body.error, "invalid_input");

        let response = send(&state, "PUT", "/releases/25/metadata", Some(r#"{"cost": 1500}"#)).await;
        let metadata: ReleaseMetadata = json_body(response).await;
        assert_eq!(metadata.cost, 1500);
        assert_eq!(metadata.rating, 4);

        let response = send(&state, "PUT", "/releases/4/metadata", Some(r#"{"cost": 1}"#)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_folder_lookup_and_search() {
        let state = state(&catalog());
        send(&state, "POST", "/collection/resync", None).await;

        let response = send(
            &state,
            "POST",
            "/folders/releases",
            Some(r#"{"selectors": [{"name": "TestingTwo"}]}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let releases: Vec<Release> = json_body(response).await;
        assert!(releases.is_empty());

        let response = send(
            &state,
            "POST",
            "/folders/releases",
            Some(r#"{"selectors": [{"name": "Nowhere"}]}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&state, "GET", "/search?q=spider", None).await;
        let found: Vec<Release> = json_body(response).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 25);
    }

    #[tokio::test]
    async fn test_want_flow() {
        let state = state(&catalog());
        send(&state, "POST", "/wants/sync", None).await;

        let response = send(&state, "POST", "/wants", Some(r#"{"release_id": 88}"#)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&state, "PUT", "/wants/77", Some(r#"{"valued": true}"#)).await;
        let want: Want = json_body(response).await;
        assert!(want.valued && want.wanted);

        let response = send(&state, "POST", "/wants/collapse", None).await;
        let wants: Vec<Want> = json_body(response).await;
        assert!(wants.iter().all(|w| w.wanted == w.valued));

        let response = send(&state, "POST", "/wants/rebuild", None).await;
        let wants: Vec<Want> = json_body(response).await;
        assert!(wants.iter().all(|w| w.wanted));

        let response = send(&state, "GET", "/releases/77", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_spend_and_status() {
        let state = state(&catalog());
        let response = send(&state, "GET", "/spend?year=1977&month=13", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&state, "GET", "/spend?year=1977", None).await;
        let report: SpendReport = json_body(response).await;
        assert_eq!(report.total, 0);

        let response = send(&state, "GET", "/status", None).await;
        let status: SyncStatus = json_body(response).await;
        assert!(status.last_resync.is_none());
    }
}
