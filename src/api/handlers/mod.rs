use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::codec::EXPORT_FILENAME;
use crate::error::TreeError;
use crate::models::*;
use crate::progress::ProgressSummary;
use crate::tree::Forest;
use crate::workspace::Workspace;

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Map a tree error to a response. Caller mistakes are returned as-is;
/// storage failures are logged and reported with a generic message.
fn api_error(e: TreeError) -> (StatusCode, String) {
    match e {
        TreeError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        TreeError::NotAContainer(_)
        | TreeError::NotADocument(_)
        | TreeError::IndexOutOfRange { .. }
        | TreeError::Parse(_)
        | TreeError::ContentDecode(_) => {
            tracing::warn!("Rejected request: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        TreeError::IdsExhausted(_) => {
            tracing::error!("Rejected request: {}", e);
            (StatusCode::CONFLICT, e.to_string())
        }
        TreeError::Persistence(_) => {
            tracing::error!("Internal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save changes; nothing was modified".to_string(),
            )
        }
    }
}

fn not_found(id: NodeId) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("Node not found: {}", id))
}

fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename.replace('"', "'"))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Outline
// ============================================================

pub async fn list_nodes(State(ws): State<Workspace>) -> Json<Arc<Forest>> {
    Json(ws.forest())
}

pub async fn get_node(
    State(ws): State<Workspace>,
    Path(id): Path<NodeId>,
) -> ApiResult<Json<Arc<Node>>> {
    ws.get(id).map(Json).ok_or_else(|| not_found(id))
}

pub async fn create_node(
    State(ws): State<Workspace>,
    Json(input): Json<CreateNodeInput>,
) -> ApiResult<(StatusCode, Json<Arc<Node>>)> {
    ws.create(input)
        .map(|n| (StatusCode::CREATED, Json(n)))
        .map_err(api_error)
}

/// Always succeeds: a stale id from the client is simply ignored.
pub async fn delete_node(
    State(ws): State<Workspace>,
    Path(id): Path<NodeId>,
) -> ApiResult<StatusCode> {
    ws.delete(id).map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rename_node(
    State(ws): State<Workspace>,
    Path(id): Path<NodeId>,
    Json(input): Json<RenameNodeInput>,
) -> ApiResult<Json<Arc<Node>>> {
    ws.rename(id, &input.name)
        .map_err(api_error)?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

pub async fn update_content(
    State(ws): State<Workspace>,
    Path(id): Path<NodeId>,
    Json(input): Json<UpdateContentInput>,
) -> ApiResult<Json<Arc<Node>>> {
    ws.update_content(id, input)
        .map_err(api_error)?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

pub async fn update_metadata(
    State(ws): State<Workspace>,
    Path(id): Path<NodeId>,
    Json(patch): Json<MetadataPatch>,
) -> ApiResult<Json<Arc<Node>>> {
    ws.update_metadata(id, &patch)
        .map_err(api_error)?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

pub async fn get_progress(
    State(ws): State<Workspace>,
    Path(id): Path<NodeId>,
) -> ApiResult<Json<ProgressSummary>> {
    ws.progress(id).map(Json).ok_or_else(|| not_found(id))
}

pub async fn download_document(
    State(ws): State<Workspace>,
    Path(id): Path<NodeId>,
) -> ApiResult<impl IntoResponse> {
    let export = ws
        .document_export(id)
        .map_err(api_error)?
        .ok_or_else(|| not_found(id))?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, attachment(&export.filename)),
        ],
        export.body,
    ))
}

pub async fn reorder(
    State(ws): State<Workspace>,
    Json(input): Json<ReorderInput>,
) -> ApiResult<Json<Arc<Forest>>> {
    match ws.reorder(&input).map_err(api_error)? {
        Some(forest) => Ok(Json(forest)),
        None => Err(not_found(input.parent_id.unwrap_or_default())),
    }
}

// ============================================================
// Snapshots
// ============================================================

pub async fn export(State(ws): State<Workspace>) -> ApiResult<impl IntoResponse> {
    let body = ws.export().map_err(api_error)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, attachment(EXPORT_FILENAME)),
        ],
        body,
    ))
}

pub async fn import(State(ws): State<Workspace>, body: Bytes) -> ApiResult<Json<Arc<Forest>>> {
    ws.import_bytes(&body).map(Json).map_err(api_error)
}

pub async fn clear(State(ws): State<Workspace>) -> ApiResult<StatusCode> {
    ws.clear().map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}
