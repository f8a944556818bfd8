//! Gateway HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! Everything in `AppState` is constructed once at startup and injected here;
//! handlers never reach for ambient globals, which keeps them testable with
//! fake providers and a fake mesh-control client.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::auth::apikey::ApiKeys;
use crate::auth::device::DeviceFlow;
use crate::auth::join_token::JoinTokens;
use crate::auth::provider::ProviderRegistry;
use crate::auth::state::AuthStates;
use crate::mesh::RealmManager;
use crate::observability;
use crate::store::GatewayStore;
use axum::Router;
use meshgate_mesh::MeshControl;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use url::Url;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub public_url: Url,
    pub api_version: String,
    pub store: Arc<dyn GatewayStore + Send + Sync>,
    pub mesh: Arc<dyn MeshControl>,
    pub providers: Arc<ProviderRegistry>,
    pub auth_states: Arc<AuthStates>,
    pub realms: Arc<RealmManager>,
    pub join_tokens: Arc<JoinTokens>,
    pub api_keys: Arc<ApiKeys>,
    pub device_flow: Arc<DeviceFlow>,
    pub session_ttl_seconds: i64,
    pub join_token_ttl_seconds: u64,
    pub authkey_ttl_seconds: u64,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route(
            "/v1/system/info",
            axum::routing::get(api::system::system_info),
        )
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route(
            "/auth/providers",
            axum::routing::get(api::providers::list_providers),
        )
        .route("/auth/login", axum::routing::get(api::login::login))
        .route("/auth/callback", axum::routing::get(api::login::callback))
        .route(
            "/api/v1/join-token",
            axum::routing::post(api::tokens::create_join_token),
        )
        .route(
            "/api/v1/worker/join",
            axum::routing::post(api::tokens::worker_join),
        )
        .route(
            "/api/v1/authkey",
            axum::routing::post(api::tokens::create_auth_key),
        )
        .route("/api/v1/nodes", axum::routing::get(api::nodes::list_nodes))
        .route(
            "/api/v1/api-keys",
            axum::routing::get(api::apikeys::list_api_keys)
                .post(api::apikeys::create_api_key),
        )
        .route(
            "/api/v1/api-keys/:id",
            axum::routing::delete(api::apikeys::delete_api_key),
        )
        .route(
            "/device/code",
            axum::routing::post(api::device::start_device_flow),
        )
        .route(
            "/device/verify",
            axum::routing::post(api::device::verify_device),
        )
        .route(
            "/device/token",
            axum::routing::post(api::device::poll_device_token),
        )
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}
