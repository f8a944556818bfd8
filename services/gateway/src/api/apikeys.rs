//! API-key management handlers.
//!
//! # Purpose
//! Session-authenticated CRUD over the caller's API keys. List responses
//! carry metadata only; the plaintext appears exactly once, in the creation
//! response.
use crate::api::error::{
    ApiError, api_internal, api_not_found, api_realm_error, api_validation_error,
};
use crate::api::require_session_identity;
use crate::api::types::{
    ApiKeyCreateRequest, ApiKeyCreateResponse, ApiKeyListResponse, ApiKeyView, split_scopes,
};
use crate::app::AppState;
use crate::store::{CredentialStore, StoreError};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path = "/api/v1/api-keys",
    tag = "api-keys",
    responses(
        (status = 200, description = "List API keys (metadata only)", body = ApiKeyListResponse),
        (status = 401, description = "Unauthorized", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_api_keys(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiKeyListResponse>, ApiError> {
    let identity = require_session_identity(&state, &headers).await?;
    let keys = state
        .store
        .list_api_keys(&identity.id)
        .await
        .map_err(|err| api_internal("failed to list api keys", &err))?;
    Ok(Json(ApiKeyListResponse {
        items: keys.into_iter().map(ApiKeyView::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/api-keys",
    tag = "api-keys",
    request_body = ApiKeyCreateRequest,
    responses(
        (status = 201, description = "Key created; plaintext shown once", body = ApiKeyCreateResponse),
        (status = 400, description = "Validation error", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ApiKeyCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = require_session_identity(&state, &headers).await?;
    if body.name.trim().is_empty() {
        return Err(api_validation_error("name is required"));
    }
    if body.scopes.is_empty() {
        return Err(api_validation_error("at least one scope is required"));
    }
    for scope in &body.scopes {
        if scope.trim().is_empty() || scope.contains(',') {
            return Err(api_validation_error("invalid scope token"));
        }
    }

    let realm = state
        .realms
        .realm_for_identity(&identity)
        .await
        .map_err(api_realm_error)?;
    let created = state
        .api_keys
        .create(
            &identity.id,
            &realm.id,
            body.name.trim(),
            &body.scopes,
            body.expires_at,
        )
        .await
        .map_err(|err| api_internal("failed to create api key", &err))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiKeyCreateResponse {
            id: created.record.id,
            key: created.plaintext,
            name: created.record.name,
            scopes: split_scopes(&created.record.scopes),
            created_at: created.record.created_at,
            expires_at: created.record.expires_at,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/api-keys/{id}",
    tag = "api-keys",
    params(("id" = String, Path, description = "API key identifier")),
    responses(
        (status = 204, description = "Key revoked"),
        (status = 401, description = "Unauthorized", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Unknown key", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_api_key(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let identity = require_session_identity(&state, &headers).await?;
    match state.store.delete_api_key(&identity.id, &id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(StoreError::NotFound(_)) => Err(api_not_found("api key not found")),
        Err(err) => Err(api_internal("failed to delete api key", &err)),
    }
}
