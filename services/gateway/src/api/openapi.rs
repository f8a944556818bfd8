//! OpenAPI schema aggregation for the gateway API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document for
//! docs and client generation.
use crate::api::{
    apikeys, device, login, nodes, providers, system, tokens,
    types::{
        ApiKeyCreateRequest, ApiKeyCreateResponse, ApiKeyListResponse, ApiKeyView,
        AuthKeyRequest, BootstrapCredential, DeviceCodeResponse, DeviceTokenRequest,
        DeviceTokenResponse, DeviceVerifyAction, DeviceVerifyRequest, DeviceVerifyResponse,
        ErrorResponse, HealthStatus, JoinTokenRequest, JoinTokenResponse, NodeListResponse,
        NodeView, ProviderInfo, ProviderListResponse, SystemInfo, WorkerJoinRequest,
    },
};
use crate::model::DeviceRequestStatus;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "meshgate",
        version = "v1",
        description = "Multi-tenant gateway for a mesh-control service"
    ),
    paths(
        system::system_info,
        system::system_health,
        providers::list_providers,
        login::login,
        login::callback,
        tokens::create_join_token,
        tokens::worker_join,
        tokens::create_auth_key,
        nodes::list_nodes,
        apikeys::list_api_keys,
        apikeys::create_api_key,
        apikeys::delete_api_key,
        device::start_device_flow,
        device::verify_device,
        device::poll_device_token
    ),
    components(schemas(
        ErrorResponse,
        SystemInfo,
        HealthStatus,
        ProviderInfo,
        ProviderListResponse,
        JoinTokenRequest,
        JoinTokenResponse,
        WorkerJoinRequest,
        BootstrapCredential,
        AuthKeyRequest,
        NodeView,
        NodeListResponse,
        ApiKeyCreateRequest,
        ApiKeyCreateResponse,
        ApiKeyView,
        ApiKeyListResponse,
        DeviceCodeResponse,
        DeviceVerifyRequest,
        DeviceVerifyAction,
        DeviceVerifyResponse,
        DeviceTokenRequest,
        DeviceTokenResponse,
        DeviceRequestStatus
    ))
)]
pub struct ApiDoc;
