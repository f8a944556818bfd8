//! Node listing handler.
//!
//! # Purpose
//! Lists the caller's realm members as reported by the mesh-control service.
//! Accepts a session or an API key carrying the `nodes:read` scope.
use crate::api::error::{ApiError, api_upstream};
use crate::api::require_caller_with_realm;
use crate::api::types::{NodeListResponse, NodeView};
use crate::app::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

#[utoipa::path(
    get,
    path = "/api/v1/nodes",
    tag = "nodes",
    responses(
        (status = 200, description = "Realm members", body = NodeListResponse),
        (status = 401, description = "Unauthorized", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Insufficient scope", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_nodes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<NodeListResponse>, ApiError> {
    let (_identity, realm) = require_caller_with_realm(&state, &headers, "nodes:read").await?;
    let nodes = state.mesh.list_nodes(&realm.namespace).await.map_err(|err| {
        tracing::error!(error = ?err, "mesh-control node listing failed");
        api_upstream("mesh-control service unavailable")
    })?;
    Ok(Json(NodeListResponse {
        items: nodes.into_iter().map(NodeView::from).collect(),
    }))
}
