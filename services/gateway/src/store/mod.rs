//! Storage traits for gateway state.
//!
//! # Purpose
//! Repository-style CRUD seams over persisted entities. The gateway core
//! programs against these traits; the in-memory backend implements them for
//! development and tests, and a durable backend can be slotted in without
//! touching handlers.
use crate::model::{ApiKey, AuthState, DeviceRequest, Identity, Realm, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod memory;
pub mod sweep;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Identities and realms.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Get or create the identity for an (issuer, subject) pair. Profile
    /// fields (email, display name) are refreshed on every call; the pair and
    /// the generated ID are immutable once created.
    async fn upsert_identity(
        &self,
        issuer: &str,
        subject: &str,
        email: Option<String>,
        display_name: Option<String>,
    ) -> StoreResult<Identity>;
    async fn get_identity(&self, id: &str) -> StoreResult<Identity>;

    async fn get_realm(&self, id: &str) -> StoreResult<Realm>;
    async fn find_realm_by_owner(&self, identity_id: &str) -> StoreResult<Option<Realm>>;
    /// Insert a realm; `Conflict` when the owner already has one.
    async fn insert_realm(&self, realm: Realm) -> StoreResult<Realm>;
}

/// Sessions, auth states, API keys, and device requests.
///
/// Lookups here sit on the hot path of every authenticated request and must
/// not serialize behind a repository-wide lock; implementations provide
/// per-row atomicity instead.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn insert_session(&self, session: Session) -> StoreResult<()>;
    /// Returns the live session and touches `last_used_at`. An expired
    /// session is deleted and reported as absent.
    async fn get_session(&self, id: &str) -> StoreResult<Option<Session>>;
    async fn delete_session(&self, id: &str) -> StoreResult<()>;
    async fn sweep_sessions(&self, now: DateTime<Utc>) -> StoreResult<usize>;

    async fn insert_auth_state(&self, state: AuthState) -> StoreResult<()>;
    /// Remove and return the state record. The record is gone afterwards
    /// whether or not the caller accepts it (single use).
    async fn take_auth_state(&self, state: &str) -> StoreResult<Option<AuthState>>;
    async fn sweep_auth_states(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;

    async fn insert_api_key(&self, key: ApiKey) -> StoreResult<()>;
    async fn get_api_key(&self, id: &str) -> StoreResult<Option<ApiKey>>;
    async fn list_api_keys(&self, identity_id: &str) -> StoreResult<Vec<ApiKey>>;
    /// Delete a key owned by `identity_id`; `NotFound` when absent or owned
    /// by someone else (indistinguishable to the caller).
    async fn delete_api_key(&self, identity_id: &str, id: &str) -> StoreResult<()>;
    async fn touch_api_key(&self, id: &str, now: DateTime<Utc>) -> StoreResult<()>;

    /// Insert a device request; `Conflict` when another live (non-terminal,
    /// non-expired) request already holds the same user code.
    async fn insert_device_request(&self, request: DeviceRequest) -> StoreResult<()>;
    async fn get_device_request(&self, device_code: &str) -> StoreResult<Option<DeviceRequest>>;
    async fn get_device_request_by_user_code(
        &self,
        user_code: &str,
    ) -> StoreResult<Option<DeviceRequest>>;
    async fn update_device_request(&self, request: DeviceRequest) -> StoreResult<()>;
    async fn remove_device_request(&self, device_code: &str)
    -> StoreResult<Option<DeviceRequest>>;
    async fn sweep_device_requests(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;
}

pub trait GatewayStore: DirectoryStore + CredentialStore {}

impl<T: DirectoryStore + CredentialStore> GatewayStore for T {}
