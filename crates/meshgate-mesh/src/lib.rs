//! Typed client for the mesh-control service HTTP API.
//!
//! # Purpose
//! The gateway delegates all overlay-network operations (namespaces, preauth
//! keys, node listing, access policy) to an external mesh-control service.
//! This crate defines the [`MeshControl`] trait the gateway programs against
//! and an HTTP implementation of it, so tests can substitute an in-process
//! fake without touching handler code.
//!
//! # Notes
//! Every method is a network round trip. Callers own retry and timeout
//! policy; this client performs exactly one request per call.
pub mod client;
pub mod types;

pub use client::HttpMeshClient;
pub use types::{AclPolicy, AclRule, MeshNamespace, MeshNode, PreauthKey};

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by mesh-control operations.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mesh-control rejected request: {status} {message}")]
    Api { status: u16, message: String },
    #[error("failed to decode mesh-control response: {0}")]
    Decode(String),
}

impl MeshError {
    /// True when the service reported a name conflict (resource exists).
    pub fn is_conflict(&self) -> bool {
        matches!(self, MeshError::Api { status: 409, .. })
    }
}

pub type MeshResult<T> = Result<T, MeshError>;

/// Operations the gateway needs from the mesh-control service.
#[async_trait]
pub trait MeshControl: Send + Sync {
    async fn list_namespaces(&self) -> MeshResult<Vec<MeshNamespace>>;
    async fn create_namespace(&self, name: &str) -> MeshResult<MeshNamespace>;
    async fn create_preauth_key(
        &self,
        namespace: &str,
        ttl_seconds: u64,
        reusable: bool,
    ) -> MeshResult<PreauthKey>;
    async fn list_nodes(&self, namespace: &str) -> MeshResult<Vec<MeshNode>>;
    async fn get_policy(&self) -> MeshResult<AclPolicy>;
    async fn put_policy(&self, policy: &AclPolicy) -> MeshResult<()>;
}
