//! Gateway HTTP API module.
//!
//! # Purpose
//! Route handler modules plus the shared caller-authentication helpers used
//! by every protected endpoint.
pub mod apikeys;
pub mod device;
pub mod error;
pub mod login;
pub mod nodes;
pub mod openapi;
pub mod providers;
pub mod system;
pub mod tokens;
pub mod types;

use crate::api::error::{
    ApiError, api_forbidden, api_internal, api_realm_error, api_unauthorized,
};
use crate::app::AppState;
use crate::auth::apikey::has_scope;
use crate::auth::session::session_token_from_headers;
use crate::model::{Identity, Realm};
use crate::store::{CredentialStore, DirectoryStore};
use axum::http::HeaderMap;

/// Resolve the caller from a session header/cookie. Invalid, unknown, and
/// expired sessions all produce the same 401.
pub(crate) async fn require_session_identity(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Identity, ApiError> {
    let token = session_token_from_headers(headers)
        .ok_or_else(|| api_unauthorized("missing session"))?;
    let session = state
        .store
        .get_session(&token)
        .await
        .map_err(|err| api_internal("failed to look up session", &err))?
        .ok_or_else(|| api_unauthorized("invalid session"))?;
    state
        .store
        .get_identity(&session.identity_id)
        .await
        .map_err(|_| api_unauthorized("invalid session"))
}

/// Resolve the caller and their realm from either a session or an API key
/// carrying `scope`. API keys are bound to the realm they were created in;
/// session callers get their realm via the (idempotent) realm manager.
pub(crate) async fn require_caller_with_realm(
    state: &AppState,
    headers: &HeaderMap,
    scope: &str,
) -> Result<(Identity, Realm), ApiError> {
    if let Some(raw) = extract_bearer(headers) {
        let key = state
            .api_keys
            .authenticate(raw)
            .await
            .map_err(|err| api_internal("failed to look up api key", &err))?
            .ok_or_else(|| api_unauthorized("invalid api key"))?;
        if !has_scope(&key.scopes, scope) {
            return Err(api_forbidden("insufficient scope"));
        }
        let identity = state
            .store
            .get_identity(&key.identity_id)
            .await
            .map_err(|_| api_unauthorized("invalid api key"))?;
        let realm = state
            .store
            .get_realm(&key.realm_id)
            .await
            .map_err(|_| api_unauthorized("invalid api key"))?;
        return Ok((identity, realm));
    }

    let identity = require_session_identity(state, headers).await?;
    let realm = state
        .realms
        .realm_for_identity(&identity)
        .await
        .map_err(api_realm_error)?;
    Ok((identity, realm))
}

pub(crate) fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?;
    let value = value.to_str().ok()?;
    value.strip_prefix("Bearer ")
}
