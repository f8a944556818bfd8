//! HTTP API request/response types.
//!
//! # Purpose
//! Shared payload shapes for the gateway REST API and OpenAPI schema
//! generation.
use chrono::{DateTime, Utc};
use meshgate_mesh::{MeshNode, PreauthKey};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub api_version: String,
    pub public_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ProviderInfo {
    pub name: String,
    pub issuer: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProviderListResponse {
    pub items: Vec<ProviderInfo>,
}

#[derive(Debug, Deserialize, ToSchema, Clone, Default)]
pub struct JoinTokenRequest {
    /// Token lifetime; defaults to one hour, capped at 24 hours.
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct JoinTokenResponse {
    pub join_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Clone)]
pub struct WorkerJoinRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct BootstrapCredential {
    pub auth_key: String,
    pub namespace: String,
    pub reusable: bool,
    pub expires_at: DateTime<Utc>,
}

impl From<PreauthKey> for BootstrapCredential {
    fn from(key: PreauthKey) -> Self {
        Self {
            auth_key: key.key,
            namespace: key.namespace,
            reusable: key.reusable,
            expires_at: key.expires_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Clone, Default)]
pub struct AuthKeyRequest {
    /// Credential lifetime; defaults to one hour.
    pub ttl_seconds: Option<u64>,
    #[serde(default)]
    pub reusable: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct NodeView {
    pub id: String,
    pub name: String,
    pub addresses: Vec<String>,
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

impl From<MeshNode> for NodeView {
    fn from(node: MeshNode) -> Self {
        Self {
            id: node.id,
            name: node.name,
            addresses: node.addresses,
            online: node.online,
            last_seen: node.last_seen,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NodeListResponse {
    pub items: Vec<NodeView>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Clone)]
pub struct ApiKeyCreateRequest {
    pub name: String,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ApiKeyCreateResponse {
    pub id: String,
    /// Shown exactly once; not recoverable afterwards.
    pub key: String,
    pub name: String,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ApiKeyView {
    pub id: String,
    pub name: String,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<crate::model::ApiKey> for ApiKeyView {
    fn from(key: crate::model::ApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name,
            scopes: split_scopes(&key.scopes),
            created_at: key.created_at,
            expires_at: key.expires_at,
            last_used_at: key.last_used_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyListResponse {
    pub items: Vec<ApiKeyView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    /// Where the user should go to type the user code.
    pub verification_uri: String,
    pub expires_in: u64,
    /// Suggested polling interval in seconds.
    pub interval: u64,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Clone)]
pub struct DeviceVerifyRequest {
    pub user_code: String,
    pub action: DeviceVerifyAction,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceVerifyAction {
    Approve,
    Deny,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct DeviceVerifyResponse {
    pub status: crate::model::DeviceRequestStatus,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Clone)]
pub struct DeviceTokenRequest {
    pub device_code: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct DeviceTokenResponse {
    pub status: crate::model::DeviceRequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<BootstrapCredential>,
}

pub(crate) fn split_scopes(scopes: &str) -> Vec<String> {
    scopes
        .split(',')
        .map(str::trim)
        .filter(|scope| !scope.is_empty())
        .map(str::to_string)
        .collect()
}
