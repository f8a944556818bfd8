//! OIDC login and callback handlers.
//!
//! # Purpose
//! `/auth/login` validates the target and redirects to the chosen provider;
//! `/auth/callback` completes the exchange, resolves the caller's realm,
//! synchronizes the ACL policy, and issues a session.
use crate::api::error::{
    ApiError, api_internal, api_realm_error, api_upstream, api_validation_error,
};
use crate::app::AppState;
use crate::auth::provider::ProviderError;
use crate::auth::session::{SESSION_HEADER, mint_session, session_cookie};
use crate::auth::state::redirect_is_same_origin;
use crate::store::{CredentialStore, DirectoryStore};
use axum::extract::{Query, State};
use axum::http::{HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;

#[utoipa::path(
    get,
    path = "/auth/login",
    tag = "auth",
    params(
        ("provider" = String, Query, description = "Configured provider name"),
        ("redirect_uri" = Option<String>, Query, description = "Post-login redirect target (same-origin)")
    ),
    responses(
        (status = 302, description = "Redirect to the identity provider"),
        (status = 400, description = "Unknown provider or invalid redirect target", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn login(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let provider_name = params
        .get("provider")
        .ok_or_else(|| api_validation_error("provider is required"))?;
    let provider = state
        .providers
        .get(provider_name)
        .ok_or_else(|| api_validation_error("unknown provider"))?;

    let redirect_uri = params
        .get("redirect_uri")
        .cloned()
        .unwrap_or_else(|| "/".to_string());
    if !redirect_is_same_origin(&state.public_url, &redirect_uri) {
        return Err(api_validation_error("redirect_uri must be same-origin"));
    }

    let auth_state = state
        .auth_states
        .create(&redirect_uri, provider.name())
        .await
        .map_err(|err| api_internal("failed to persist login state", &err))?;

    let target = provider.auth_url(&auth_state.state, &auth_state.nonce);
    Ok(found(&target, Vec::new()))
}

#[utoipa::path(
    get,
    path = "/auth/callback",
    tag = "auth",
    params(
        ("code" = String, Query, description = "Authorization code from the provider"),
        ("state" = String, Query, description = "Login state token")
    ),
    responses(
        (status = 302, description = "Session issued; redirect to the original target"),
        (status = 400, description = "Missing, invalid, or already-consumed state", body = crate::api::types::ErrorResponse),
        (status = 502, description = "Provider or mesh-control failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn callback(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let code = params
        .get("code")
        .ok_or_else(|| api_validation_error("code is required"))?;
    let state_token = params
        .get("state")
        .ok_or_else(|| api_validation_error("state is required"))?;

    // Single use: the record is consumed here whether or not the rest of the
    // login succeeds, so a replayed callback always fails.
    let record = state
        .auth_states
        .validate(state_token)
        .await
        .map_err(|err| api_internal("failed to validate login state", &err))?
        .ok_or_else(|| api_validation_error("login state invalid, expired, or already used"))?;

    let provider = state
        .providers
        .get(&record.provider)
        .ok_or_else(|| api_validation_error("unknown provider"))?;

    let info = match provider.exchange_code(code, &record.nonce).await {
        Ok(info) => info,
        Err(ProviderError::Exchange(reason)) => {
            tracing::error!(provider = provider.name(), %reason, "code exchange failed");
            return Err(api_upstream("identity provider rejected the code exchange"));
        }
        Err(ProviderError::Verify(reason)) => {
            tracing::error!(provider = provider.name(), %reason, "identity token verification failed");
            return Err(api_upstream("identity token verification failed"));
        }
        Err(ProviderError::Profile(reason)) => {
            tracing::error!(provider = provider.name(), %reason, "profile fetch failed");
            return Err(api_upstream("identity provider profile fetch failed"));
        }
    };

    let identity = state
        .store
        .upsert_identity(&info.issuer, &info.subject, info.email, info.display_name)
        .await
        .map_err(|err| api_internal("failed to persist identity", &err))?;

    let realm = state
        .realms
        .realm_for_identity(&identity)
        .await
        .map_err(api_realm_error)?;

    let session = mint_session(&identity.id, state.session_ttl_seconds);
    state
        .store
        .insert_session(session.clone())
        .await
        .map_err(|err| api_internal("failed to persist session", &err))?;

    metrics::counter!("meshgate_logins_total", "provider" => provider.name().to_string())
        .increment(1);
    tracing::info!(
        provider = provider.name(),
        identity = %identity.id,
        realm = %realm.id,
        "login completed"
    );

    Ok(found(
        &record.redirect_uri,
        vec![
            (
                header::SET_COOKIE,
                session_cookie(&session.id, state.session_ttl_seconds),
            ),
            (HeaderName::from_static(SESSION_HEADER), session.id.clone()),
        ],
    ))
}

fn found(location: &str, extra: Vec<(HeaderName, String)>) -> Response {
    let mut response = StatusCode::FOUND.into_response();
    if let Ok(value) = location.parse() {
        response.headers_mut().insert(header::LOCATION, value);
    }
    for (name, value) in extra {
        if let Ok(value) = value.parse() {
            response.headers_mut().insert(name, value);
        }
    }
    response
}
