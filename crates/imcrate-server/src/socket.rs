//! Unix domain socket handler for local clients
//!
//! Line-delimited JSON-RPC. Method names match the RPC surface:
//! `SaveCollection`, `GetCollection`, `GetReleasesInFolder`, and so on.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

use imcrate_core::{ErrorKind, Folder, FolderSelector, MetadataPatch, SyncError, WantPatch};

use crate::AppState;

pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const NOT_FOUND: i64 = -32004;
pub const INVALID_STATE: i64 = -32009;
pub const UPSTREAM_FAILURE: i64 = -32002;
pub const PERSISTENCE_FAILURE: i64 = -32003;

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl From<SyncError> for RpcError {
    fn from(err: SyncError) -> Self {
        let code = match err.kind() {
            ErrorKind::NotFound => NOT_FOUND,
            ErrorKind::InvalidInput => INVALID_PARAMS,
            ErrorKind::InvalidState => INVALID_STATE,
            ErrorKind::UpstreamFailure => UPSTREAM_FAILURE,
            ErrorKind::PersistenceFailure | ErrorKind::Config => PERSISTENCE_FAILURE,
        };
        Self {
            code,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: format!("Invalid params: {}", err),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IdParams {
    id: i32,
}

#[derive(Debug, Deserialize)]
struct SelectorParams {
    selectors: Vec<FolderSelector>,
}

#[derive(Debug, Deserialize)]
struct AddToFolderParams {
    id: i32,
    folder_id: i32,
}

#[derive(Debug, Deserialize)]
struct RatingParams {
    id: i32,
    rating: i32,
}

#[derive(Debug, Deserialize)]
struct MetadataParams {
    id: i32,
    #[serde(flatten)]
    patch: MetadataPatch,
}

#[derive(Debug, Deserialize)]
struct SpendParams {
    year: i32,
    month: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
}

#[derive(Debug, Deserialize)]
struct EditWantParams {
    id: i32,
    #[serde(flatten)]
    patch: WantPatch,
}

#[derive(Debug, Deserialize)]
struct FoldersParams {
    folders: Vec<Folder>,
}

fn params<T: DeserializeOwned>(request: &Value) -> Result<T, RpcError> {
    let params = request.get("params").cloned().unwrap_or(Value::Null);
    Ok(serde_json::from_value(params)?)
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, RpcError> {
    Ok(serde_json::to_value(value)?)
}

/// Start the Unix socket server
pub async fn serve_unix_socket(
    path: impl AsRef<Path>,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Remove existing socket file
    let path = path.as_ref();
    if path.exists() {
        std::fs::remove_file(path)?;
    }

    let listener = UnixListener::bind(path)?;
    tracing::info!("Unix socket listening on {:?}", path);

    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    if let Err(e) = handle_unix_connection(stream, state).await {
                        tracing::error!("Unix socket connection error: {}", e);
                    }
                });
            }
            Err(e) => {
                tracing::error!("Unix socket accept error: {}", e);
            }
        }
    }
}

/// Handle a Unix socket connection
async fn handle_unix_connection(
    stream: UnixStream,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        match serde_json::from_str::<Value>(&line) {
            Ok(request) => {
                let response = handle_request(&request, &state).await;
                let response_str = serde_json::to_string(&response)? + "\n";
                writer.write_all(response_str.as_bytes()).await?;
            }
            Err(e) => tracing::debug!("Ignoring malformed request line: {}", e),
        }
        line.clear();
    }

    Ok(())
}

/// Handle a request from a Unix socket client
pub async fn handle_request(request: &Value, state: &Arc<AppState>) -> Value {
    let method = request.get("method").and_then(|m| m.as_str());
    let id = request.get("id").cloned().unwrap_or(Value::Null);

    match dispatch(method, request, state).await {
        Ok(result) => json!({
            "id": id,
            "result": result
        }),
        Err(e) => json!({
            "id": id,
            "error": {
                "code": e.code,
                "message": e.message
            }
        }),
    }
}

async fn dispatch(
    method: Option<&str>,
    request: &Value,
    state: &Arc<AppState>,
) -> Result<Value, RpcError> {
    let Some(method) = method else {
        return Err(RpcError {
            code: METHOD_NOT_FOUND,
            message: "Method not found".to_string(),
        });
    };
    let mut syncer = state.syncer.lock().await;

    match method {
        "SaveCollection" => to_value(syncer.resync()?),
        "GetCollection" => to_value(syncer.get_collection()),
        "GetReleasesInFolder" => {
            let p: SelectorParams = params(request)?;
            to_value(syncer.releases_in_folders(&p.selectors)?)
        }
        "GetSingleRelease" => {
            let p: IdParams = params(request)?;
            to_value(syncer.single_release(p.id)?)
        }
        "AddToFolder" => {
            let p: AddToFolderParams = params(request)?;
            to_value(syncer.add_to_folder(p.id, p.folder_id)?)
        }
        "UpdateRating" => {
            let p: RatingParams = params(request)?;
            to_value(syncer.update_rating(p.id, p.rating)?)
        }
        "GetMetadata" => {
            let p: IdParams = params(request)?;
            to_value(syncer.metadata(p.id)?)
        }
        "UpdateMetadata" => {
            let p: MetadataParams = params(request)?;
            to_value(syncer.update_metadata(p.id, &p.patch)?)
        }
        "GetSpend" => {
            let p: SpendParams = params(request)?;
            to_value(syncer.spend(p.month, p.year))
        }
        "Search" => {
            let p: SearchParams = params(request)?;
            to_value(syncer.search(&p.query))
        }
        "GetWantlist" => to_value(syncer.wantlist()),
        "SyncWantlist" => to_value(syncer.sync_wantlist()?),
        "AddWant" => {
            let p: IdParams = params(request)?;
            to_value(syncer.add_want(p.id)?)
        }
        "EditWant" => {
            let p: EditWantParams = params(request)?;
            to_value(syncer.edit_want(p.id, &p.patch)?)
        }
        "DeleteWant" => {
            let p: IdParams = params(request)?;
            to_value(syncer.delete_want(p.id)?)
        }
        "CollapseWantlist" => to_value(syncer.collapse_wantlist()?),
        "RebuildWantlist" => to_value(syncer.rebuild_wantlist()?),
        "SaveFolders" => {
            let p: FoldersParams = params(request)?;
            to_value(syncer.save_folders(&p.folders)?)
        }
        "GetFolders" => to_value(syncer.folders()),
        "GetState" => to_value(syncer.status()),
        _ => Err(RpcError {
            code: METHOD_NOT_FOUND,
            message: format!("Method not found: {}", method),
        }),
    }
}
