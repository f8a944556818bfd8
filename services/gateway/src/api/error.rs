//! API error types and helpers.
//!
//! # Purpose
//! Centralizes HTTP error construction so every endpoint returns the same
//! `{code, message, request_id}` shape with a stable machine-readable code.
//!
//! # Notes
//! Internal and upstream errors log details server-side and return generic
//! messages; authentication failures never reveal whether the underlying
//! credential or identity exists.
use crate::api::types::ErrorResponse;
use crate::mesh::RealmError;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error returned by handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn build(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

pub fn api_not_found(message: &str) -> ApiError {
    build(StatusCode::NOT_FOUND, "not_found", message)
}

pub fn api_conflict(code: &str, message: &str) -> ApiError {
    build(StatusCode::CONFLICT, code, message)
}

pub fn api_unauthorized(message: &str) -> ApiError {
    // Authentication failed or missing.
    build(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

pub fn api_forbidden(message: &str) -> ApiError {
    // Authorization failed despite authentication.
    build(StatusCode::FORBIDDEN, "forbidden", message)
}

pub fn api_validation_error(message: &str) -> ApiError {
    build(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// 410 for device codes whose window has closed.
pub fn api_gone(message: &str) -> ApiError {
    build(StatusCode::GONE, "expired", message)
}

pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "gateway storage error");
    build(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

pub fn api_internal_message(message: &str) -> ApiError {
    build(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// 502 for failures of the identity provider or the mesh-control service.
pub fn api_upstream(message: &str) -> ApiError {
    build(StatusCode::BAD_GATEWAY, "upstream_error", message)
}

/// Map realm/mesh orchestration failures onto the error taxonomy: store
/// failures are internal, downstream mesh-control failures are upstream, and
/// a failed ACL sync is a hard upstream failure of the whole operation.
pub fn api_realm_error(err: RealmError) -> ApiError {
    match err {
        RealmError::Store(store_err) => api_internal("realm lookup failed", &store_err),
        RealmError::Mesh(mesh_err) => {
            tracing::error!(error = ?mesh_err, "mesh-control request failed");
            api_upstream("mesh-control service unavailable")
        }
        RealmError::PolicySync(mesh_err) => {
            tracing::error!(error = ?mesh_err, "acl policy sync failed");
            api_upstream("access policy synchronization failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_build_expected_codes() {
        let not_found = api_not_found("missing");
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.body.code, "not_found");

        let conflict = api_conflict("already_exists", "conflict");
        assert_eq!(conflict.status, StatusCode::CONFLICT);
        assert_eq!(conflict.body.code, "already_exists");

        let unauthorized = api_unauthorized("nope");
        assert_eq!(unauthorized.status, StatusCode::UNAUTHORIZED);

        let forbidden = api_forbidden("nope");
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

        let validation = api_validation_error("bad");
        assert_eq!(validation.status, StatusCode::BAD_REQUEST);

        let gone = api_gone("expired");
        assert_eq!(gone.status, StatusCode::GONE);
        assert_eq!(gone.body.code, "expired");

        let upstream = api_upstream("down");
        assert_eq!(upstream.status, StatusCode::BAD_GATEWAY);
        assert_eq!(upstream.body.code, "upstream_error");
    }

    #[test]
    fn realm_errors_map_to_taxonomy() {
        let store = api_realm_error(RealmError::Store(StoreError::NotFound("realm".into())));
        assert_eq!(store.status, StatusCode::INTERNAL_SERVER_ERROR);

        let sync = api_realm_error(RealmError::PolicySync(meshgate_mesh::MeshError::Api {
            status: 500,
            message: "refused".to_string(),
        }));
        assert_eq!(sync.status, StatusCode::BAD_GATEWAY);
    }
}
