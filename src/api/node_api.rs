//! 节点管理 API
//!
//! - `GET    /api/v1/nodes`
//! - `POST   /api/v1/nodes`
//! - `GET    /api/v1/nodes/:id`
//! - `PUT    /api/v1/nodes/:id`
//! - `DELETE /api/v1/nodes/:id`
//! - `GET    /api/v1/nodes/:id/status`

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    api::middleware::TraceId,
    app_state::AppState,
    domain::NodeRecord,
    error::AppError,
    service::{node_monitor::NodeStatus, CreateNodeRequest, UpdateNodeRequest},
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_nodes).post(create_node))
        .route("/:id", get(get_node).put(update_node).delete(delete_node))
        .route("/:id/status", get(get_node_status))
}

#[derive(Debug, Serialize)]
pub struct NodesResponse {
    pub nodes: Vec<NodeRecord>,
}

/// 路径中的节点 id；格式错误返回 400
pub(crate) fn parse_node_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request(format!("invalid node id: {}", raw)))
}

#[utoipa::path(
    get,
    path = "/api/v1/nodes",
    responses(
        (status = 200, description = "All nodes wrapped as { nodes: [...] }"),
        (status = 500, description = "Storage failure", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn list_nodes(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
) -> Result<Json<NodesResponse>, AppError> {
    let nodes = st
        .node_service
        .get_all()
        .await
        .map_err(|e| trace_id.attach(e))?;
    Ok(Json(NodesResponse { nodes }))
}

#[utoipa::path(
    post,
    path = "/api/v1/nodes",
    request_body = CreateNodeRequest,
    responses(
        (status = 200, description = "Created node"),
        (status = 400, description = "Validation failed, duplicate node or connection test failed", body = crate::error_body::ValidationErrorBodyDoc)
    )
)]
pub async fn create_node(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Json(req): Json<CreateNodeRequest>,
) -> Result<Json<NodeRecord>, AppError> {
    let record = st
        .node_service
        .create(req)
        .await
        .map_err(|e| trace_id.attach(e))?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/api/v1/nodes/{id}",
    params(("id" = String, Path, description = "Node UUID")),
    responses(
        (status = 200, description = "Node"),
        (status = 400, description = "Malformed id", body = crate::error_body::ErrorBodyDoc),
        (status = 404, description = "Unknown node", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn get_node(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Path(id): Path<String>,
) -> Result<Json<NodeRecord>, AppError> {
    let id = parse_node_id(&id).map_err(|e| trace_id.attach(e))?;
    let record = st
        .node_service
        .get(id)
        .await
        .map_err(|e| trace_id.attach(e))?;
    Ok(Json(record))
}

#[utoipa::path(
    put,
    path = "/api/v1/nodes/{id}",
    params(("id" = String, Path, description = "Node UUID")),
    request_body = UpdateNodeRequest,
    responses(
        (status = 200, description = "Updated node"),
        (status = 400, description = "Validation failed or malformed id", body = crate::error_body::ValidationErrorBodyDoc),
        (status = 404, description = "Unknown node", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn update_node(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNodeRequest>,
) -> Result<Json<NodeRecord>, AppError> {
    let id = parse_node_id(&id).map_err(|e| trace_id.attach(e))?;
    let record = st
        .node_service
        .update(id, req)
        .await
        .map_err(|e| trace_id.attach(e))?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/api/v1/nodes/{id}",
    params(("id" = String, Path, description = "Node UUID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Malformed id", body = crate::error_body::ErrorBodyDoc),
        (status = 404, description = "Unknown node", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn delete_node(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_node_id(&id).map_err(|e| trace_id.attach(e))?;
    st.node_service
        .delete(id)
        .await
        .map_err(|e| trace_id.attach(e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/nodes/{id}/status",
    params(("id" = String, Path, description = "Node UUID")),
    responses(
        (status = 200, description = "Latest polled telemetry"),
        (status = 404, description = "Node not polled yet", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn get_node_status(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Path(id): Path<String>,
) -> Result<Json<NodeStatus>, AppError> {
    let id = parse_node_id(&id).map_err(|e| trace_id.attach(e))?;
    st.statuses.get(id).await.map(Json).ok_or_else(|| {
        trace_id.attach(AppError::not_found(format!(
            "no status for node {} yet",
            id
        )))
    })
}
