//! Device-authorization-flow handlers.
//!
//! # Purpose
//! `/device/code` starts a flow, `/device/verify` lets an authenticated user
//! approve or deny a pending request, and `/device/token` is the CLI's poll
//! endpoint (202 pending, 200 approved, 410 expired, 403 denied).
//!
//! # Notes
//! Lookups answer "not found" uniformly whether a code never existed or has
//! expired, so callers cannot probe code validity.
use crate::api::error::{
    ApiError, api_conflict, api_forbidden, api_gone, api_internal, api_internal_message,
    api_not_found, api_realm_error,
};
use crate::api::require_session_identity;
use crate::api::types::{
    DeviceCodeResponse, DeviceTokenRequest, DeviceTokenResponse, DeviceVerifyAction,
    DeviceVerifyRequest, DeviceVerifyResponse,
};
use crate::app::AppState;
use crate::auth::device::{DEVICE_REQUEST_TTL_SECS, DeviceFlowError, POLL_INTERVAL_SECS};
use crate::model::DeviceRequestStatus;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::time::Duration;

#[utoipa::path(
    post,
    path = "/device/code",
    tag = "device",
    responses(
        (status = 200, description = "Flow started", body = DeviceCodeResponse)
    )
)]
pub(crate) async fn start_device_flow(
    State(state): State<AppState>,
) -> Result<Json<DeviceCodeResponse>, ApiError> {
    let request = match state.device_flow.create().await {
        Ok(request) => request,
        Err(DeviceFlowError::CodesExhausted) => {
            return Err(api_internal_message("could not allocate a user code"));
        }
        Err(DeviceFlowError::Store(err)) => {
            return Err(api_internal("failed to start device flow", &err));
        }
        Err(_) => return Err(api_internal_message("failed to start device flow")),
    };
    Ok(Json(DeviceCodeResponse {
        device_code: request.device_code,
        user_code: request.user_code,
        verification_uri: format!("{}device", state.public_url),
        expires_in: DEVICE_REQUEST_TTL_SECS as u64,
        interval: POLL_INTERVAL_SECS,
    }))
}

#[utoipa::path(
    post,
    path = "/device/verify",
    tag = "device",
    request_body = DeviceVerifyRequest,
    responses(
        (status = 200, description = "Request approved or denied", body = DeviceVerifyResponse),
        (status = 401, description = "Unauthorized", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Unknown or expired user code", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Request already settled", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn verify_device(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DeviceVerifyRequest>,
) -> Result<Json<DeviceVerifyResponse>, ApiError> {
    let identity = require_session_identity(&state, &headers).await?;

    let request = state
        .device_flow
        .get_by_user_code(&body.user_code)
        .await
        .map_err(|err| api_internal("failed to look up device request", &err))?;
    // Expired and unknown codes are indistinguishable to the approver.
    let request = match request {
        Some(request) if request.status != DeviceRequestStatus::Expired => request,
        _ => return Err(api_not_found("unknown user code")),
    };
    if request.status != DeviceRequestStatus::Pending {
        return Err(api_conflict("not_pending", "device request already settled"));
    }

    let settled = match body.action {
        DeviceVerifyAction::Approve => {
            let realm = state
                .realms
                .realm_for_identity(&identity)
                .await
                .map_err(api_realm_error)?;
            let credential = state
                .realms
                .create_auth_key_by_name(
                    &realm.namespace,
                    Duration::from_secs(state.authkey_ttl_seconds),
                    false,
                )
                .await
                .map_err(api_realm_error)?;
            state
                .device_flow
                .approve(&body.user_code, &identity.id, credential)
                .await
        }
        DeviceVerifyAction::Deny => state.device_flow.deny(&body.user_code, &identity.id).await,
    };

    match settled {
        Ok(request) => Ok(Json(DeviceVerifyResponse {
            status: request.status,
        })),
        Err(DeviceFlowError::NotFound) => Err(api_not_found("unknown user code")),
        Err(DeviceFlowError::NotPending) => {
            Err(api_conflict("not_pending", "device request already settled"))
        }
        Err(DeviceFlowError::Store(err)) => {
            Err(api_internal("failed to update device request", &err))
        }
        Err(_) => Err(api_internal_message("failed to update device request")),
    }
}

#[utoipa::path(
    post,
    path = "/device/token",
    tag = "device",
    request_body = DeviceTokenRequest,
    responses(
        (status = 200, description = "Approved; credential delivered once", body = DeviceTokenResponse),
        (status = 202, description = "Still pending", body = DeviceTokenResponse),
        (status = 403, description = "Denied", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Unknown device code", body = crate::api::types::ErrorResponse),
        (status = 410, description = "Expired", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn poll_device_token(
    State(state): State<AppState>,
    Json(body): Json<DeviceTokenRequest>,
) -> Result<Response, ApiError> {
    let request = state
        .device_flow
        .poll(&body.device_code)
        .await
        .map_err(|err| api_internal("failed to poll device request", &err))?
        .ok_or_else(|| api_not_found("unknown device code"))?;

    match request.status {
        DeviceRequestStatus::Pending => Ok((
            StatusCode::ACCEPTED,
            Json(DeviceTokenResponse {
                status: DeviceRequestStatus::Pending,
                credential: None,
            }),
        )
            .into_response()),
        DeviceRequestStatus::Approved => {
            let credential = request
                .credential
                .ok_or_else(|| api_internal_message("approved request lost its credential"))?;
            Ok(Json(DeviceTokenResponse {
                status: DeviceRequestStatus::Approved,
                credential: Some(credential.into()),
            })
            .into_response())
        }
        DeviceRequestStatus::Expired => Err(api_gone("device code expired")),
        DeviceRequestStatus::Denied => Err(api_forbidden("device request denied")),
    }
}
