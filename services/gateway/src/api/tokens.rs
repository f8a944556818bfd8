//! Join-token and bootstrap-credential handlers.
//!
//! # Purpose
//! Minting join tokens for the caller's realm, exchanging a join token for a
//! mesh bootstrap credential, and direct credential minting for sessions.
use crate::api::error::{
    ApiError, api_internal_message, api_realm_error, api_unauthorized, api_validation_error,
};
use crate::api::types::{
    AuthKeyRequest, BootstrapCredential, JoinTokenRequest, JoinTokenResponse, WorkerJoinRequest,
};
use crate::api::require_session_identity;
use crate::app::AppState;
use crate::auth::join_token::JoinTokenError;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use std::time::Duration;

const MAX_JOIN_TOKEN_TTL_SECS: u64 = 86_400;

#[utoipa::path(
    post,
    path = "/api/v1/join-token",
    tag = "tokens",
    request_body = JoinTokenRequest,
    responses(
        (status = 200, description = "Join token minted", body = JoinTokenResponse),
        (status = 401, description = "Unauthorized", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_join_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<JoinTokenRequest>>,
) -> Result<Json<JoinTokenResponse>, ApiError> {
    let identity = require_session_identity(&state, &headers).await?;
    let realm = state
        .realms
        .realm_for_identity(&identity)
        .await
        .map_err(api_realm_error)?;

    let requested = body
        .map(|Json(value)| value)
        .unwrap_or_default()
        .ttl_seconds
        .unwrap_or(state.join_token_ttl_seconds);
    let ttl = requested.min(MAX_JOIN_TOKEN_TTL_SECS);

    let token = state
        .join_tokens
        .generate(&realm.id, &realm.namespace, Duration::from_secs(ttl))
        .map_err(|_| api_internal_message("failed to mint join token"))?;
    Ok(Json(JoinTokenResponse {
        join_token: token,
        expires_in: ttl,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/worker/join",
    tag = "tokens",
    request_body = WorkerJoinRequest,
    responses(
        (status = 200, description = "Bootstrap credential issued", body = BootstrapCredential),
        (status = 400, description = "Malformed token", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Invalid or expired token", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn worker_join(
    State(state): State<AppState>,
    Json(body): Json<WorkerJoinRequest>,
) -> Result<Json<BootstrapCredential>, ApiError> {
    // Stateless check: signature plus expiry, no store lookup.
    let claims = match state.join_tokens.validate(&body.token) {
        Ok(claims) => claims,
        Err(JoinTokenError::Malformed) => {
            return Err(api_validation_error("malformed join token"));
        }
        Err(JoinTokenError::Expired) => return Err(api_unauthorized("join token expired")),
        Err(JoinTokenError::Signature) => return Err(api_unauthorized("join token invalid")),
        Err(JoinTokenError::Key(_)) => {
            return Err(api_internal_message("join token verification unavailable"));
        }
    };

    let key = state
        .realms
        .create_auth_key_by_name(
            &claims.ns,
            Duration::from_secs(state.authkey_ttl_seconds),
            false,
        )
        .await
        .map_err(api_realm_error)?;
    metrics::counter!("meshgate_worker_joins_total").increment(1);
    Ok(Json(key.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/authkey",
    tag = "tokens",
    request_body = AuthKeyRequest,
    responses(
        (status = 200, description = "Bootstrap credential issued", body = BootstrapCredential),
        (status = 401, description = "Unauthorized", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_auth_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<AuthKeyRequest>>,
) -> Result<Json<BootstrapCredential>, ApiError> {
    let identity = require_session_identity(&state, &headers).await?;
    let realm = state
        .realms
        .realm_for_identity(&identity)
        .await
        .map_err(api_realm_error)?;
    let request = body.map(|Json(value)| value).unwrap_or_default();
    let ttl = request.ttl_seconds.unwrap_or(state.authkey_ttl_seconds);

    let key = state
        .realms
        .create_auth_key_by_name(&realm.namespace, Duration::from_secs(ttl), request.reusable)
        .await
        .map_err(api_realm_error)?;
    Ok(Json(key.into()))
}
