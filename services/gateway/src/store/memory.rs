//! In-memory implementation of the gateway store.
//!
//! # Purpose
//! Implements [`DirectoryStore`] and [`CredentialStore`] over concurrent maps
//! for local development, tests, and deployments where durability is not
//! required.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart. Realms re-heal on
//!   the next login because the mesh-control service remains the source of
//!   truth for namespaces.
//! - **Per-row atomicity**: each map entry is updated under its shard lock;
//!   there is no repository-wide lock. Credential lookups stay lock-free for
//!   readers on other shards.
//! - The one multi-entry invariant (no two live device requests sharing a
//!   user code) is guarded by a dedicated reservation mutex around the
//!   user-code index.
//!
//! # Expiry
//! Sessions are lazily deleted when a read finds them past their deadline;
//! the periodic sweeper bounds growth for credentials nobody reads again.
use super::{CredentialStore, DirectoryStore, StoreError, StoreResult};
use crate::model::{ApiKey, AuthState, DeviceRequest, Identity, Realm, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

pub struct MemoryStore {
    identities: DashMap<String, Identity>,
    /// (issuer, subject) -> identity ID.
    identity_index: DashMap<(String, String), String>,
    realms: DashMap<String, Realm>,
    /// owner identity ID -> realm ID.
    realm_owner_index: DashMap<String, String>,
    sessions: DashMap<String, Session>,
    auth_states: DashMap<String, AuthState>,
    api_keys: DashMap<String, ApiKey>,
    device_requests: DashMap<String, DeviceRequest>,
    /// user code -> device code. Guarded by a mutex so the liveness check and
    /// the reservation are one atomic step.
    user_codes: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            identities: DashMap::new(),
            identity_index: DashMap::new(),
            realms: DashMap::new(),
            realm_owner_index: DashMap::new(),
            sessions: DashMap::new(),
            auth_states: DashMap::new(),
            api_keys: DashMap::new(),
            device_requests: DashMap::new(),
            user_codes: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn upsert_identity(
        &self,
        issuer: &str,
        subject: &str,
        email: Option<String>,
        display_name: Option<String>,
    ) -> StoreResult<Identity> {
        let key = (issuer.to_string(), subject.to_string());
        // entry() holds the shard lock, so two concurrent first logins for
        // the same (issuer, subject) resolve to one identity ID.
        let id = self
            .identity_index
            .entry(key)
            .or_insert_with(|| Uuid::new_v4().simple().to_string())
            .clone();
        let identity = match self.identities.get_mut(&id) {
            Some(mut existing) => {
                existing.email = email;
                existing.display_name = display_name;
                existing.clone()
            }
            None => {
                let identity = Identity {
                    id: id.clone(),
                    issuer: issuer.to_string(),
                    subject: subject.to_string(),
                    email,
                    display_name,
                    created_at: Utc::now(),
                };
                self.identities.insert(id.clone(), identity.clone());
                metrics::gauge!("meshgate_identities_total").set(self.identities.len() as f64);
                identity
            }
        };
        Ok(identity)
    }

    async fn get_identity(&self, id: &str) -> StoreResult<Identity> {
        self.identities
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound("identity".into()))
    }

    async fn get_realm(&self, id: &str) -> StoreResult<Realm> {
        self.realms
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound("realm".into()))
    }

    async fn find_realm_by_owner(&self, identity_id: &str) -> StoreResult<Option<Realm>> {
        let Some(realm_id) = self
            .realm_owner_index
            .get(identity_id)
            .map(|entry| entry.clone())
        else {
            return Ok(None);
        };
        Ok(self.realms.get(&realm_id).map(|entry| entry.clone()))
    }

    async fn insert_realm(&self, realm: Realm) -> StoreResult<Realm> {
        // Reserve the owner slot first; a second concurrent insert for the
        // same owner loses here and re-reads the winner's realm.
        match self
            .realm_owner_index
            .entry(realm.owner_identity_id.clone())
        {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(StoreError::Conflict("owner already has a realm".into()));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(realm.id.clone());
            }
        }
        self.realms.insert(realm.id.clone(), realm.clone());
        metrics::gauge!("meshgate_realms_total").set(self.realms.len() as f64);
        Ok(realm)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_session(&self, session: Session) -> StoreResult<()> {
        self.sessions.insert(session.id.clone(), session);
        metrics::gauge!("meshgate_sessions_total").set(self.sessions.len() as f64);
        Ok(())
    }

    async fn get_session(&self, id: &str) -> StoreResult<Option<Session>> {
        let now = Utc::now();
        let expired = match self.sessions.get_mut(id) {
            Some(mut session) if !session.is_expired(now) => {
                session.last_used_at = now;
                return Ok(Some(session.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            // Lazy expiry: an expired session is indistinguishable from a
            // missing one and is removed on this read.
            self.sessions.remove(id);
            metrics::gauge!("meshgate_sessions_total").set(self.sessions.len() as f64);
        }
        Ok(None)
    }

    async fn delete_session(&self, id: &str) -> StoreResult<()> {
        self.sessions.remove(id);
        metrics::gauge!("meshgate_sessions_total").set(self.sessions.len() as f64);
        Ok(())
    }

    async fn sweep_sessions(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        let removed = before.saturating_sub(self.sessions.len());
        metrics::gauge!("meshgate_sessions_total").set(self.sessions.len() as f64);
        Ok(removed)
    }

    async fn insert_auth_state(&self, state: AuthState) -> StoreResult<()> {
        self.auth_states.insert(state.state.clone(), state);
        Ok(())
    }

    async fn take_auth_state(&self, state: &str) -> StoreResult<Option<AuthState>> {
        Ok(self.auth_states.remove(state).map(|(_, value)| value))
    }

    async fn sweep_auth_states(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let before = self.auth_states.len();
        self.auth_states
            .retain(|_, state| state.created_at > cutoff);
        Ok(before.saturating_sub(self.auth_states.len()))
    }

    async fn insert_api_key(&self, key: ApiKey) -> StoreResult<()> {
        self.api_keys.insert(key.id.clone(), key);
        Ok(())
    }

    async fn get_api_key(&self, id: &str) -> StoreResult<Option<ApiKey>> {
        Ok(self.api_keys.get(id).map(|entry| entry.clone()))
    }

    async fn list_api_keys(&self, identity_id: &str) -> StoreResult<Vec<ApiKey>> {
        Ok(self
            .api_keys
            .iter()
            .filter(|entry| entry.identity_id == identity_id)
            .map(|entry| entry.clone())
            .collect())
    }

    async fn delete_api_key(&self, identity_id: &str, id: &str) -> StoreResult<()> {
        let removed = self
            .api_keys
            .remove_if(id, |_, key| key.identity_id == identity_id);
        if removed.is_none() {
            return Err(StoreError::NotFound("api key".into()));
        }
        Ok(())
    }

    async fn touch_api_key(&self, id: &str, now: DateTime<Utc>) -> StoreResult<()> {
        if let Some(mut key) = self.api_keys.get_mut(id) {
            key.last_used_at = Some(now);
        }
        Ok(())
    }

    async fn insert_device_request(&self, request: DeviceRequest) -> StoreResult<()> {
        let mut codes = self
            .user_codes
            .lock()
            .map_err(|_| StoreError::Unexpected(anyhow::anyhow!("user-code index poisoned")))?;
        if let Some(existing_code) = codes.get(&request.user_code) {
            let live = self
                .device_requests
                .get(existing_code)
                .map(|existing| {
                    !existing.status.is_terminal() && !existing.is_past_deadline(Utc::now())
                })
                .unwrap_or(false);
            if live {
                return Err(StoreError::Conflict("user code in use".into()));
            }
        }
        codes.insert(request.user_code.clone(), request.device_code.clone());
        self.device_requests
            .insert(request.device_code.clone(), request);
        metrics::gauge!("meshgate_device_requests_total")
            .set(self.device_requests.len() as f64);
        Ok(())
    }

    async fn get_device_request(&self, device_code: &str) -> StoreResult<Option<DeviceRequest>> {
        Ok(self
            .device_requests
            .get(device_code)
            .map(|entry| entry.clone()))
    }

    async fn get_device_request_by_user_code(
        &self,
        user_code: &str,
    ) -> StoreResult<Option<DeviceRequest>> {
        let device_code = {
            let codes = self
                .user_codes
                .lock()
                .map_err(|_| StoreError::Unexpected(anyhow::anyhow!("user-code index poisoned")))?;
            codes.get(user_code).cloned()
        };
        match device_code {
            Some(code) => self.get_device_request(&code).await,
            None => Ok(None),
        }
    }

    async fn update_device_request(&self, request: DeviceRequest) -> StoreResult<()> {
        match self.device_requests.get_mut(&request.device_code) {
            Some(mut entry) => {
                *entry = request;
                Ok(())
            }
            None => Err(StoreError::NotFound("device request".into())),
        }
    }

    async fn remove_device_request(
        &self,
        device_code: &str,
    ) -> StoreResult<Option<DeviceRequest>> {
        let removed = self.device_requests.remove(device_code).map(|(_, v)| v);
        if let Some(request) = &removed {
            let mut codes = self
                .user_codes
                .lock()
                .map_err(|_| StoreError::Unexpected(anyhow::anyhow!("user-code index poisoned")))?;
            if codes.get(&request.user_code) == Some(&request.device_code) {
                codes.remove(&request.user_code);
            }
        }
        metrics::gauge!("meshgate_device_requests_total")
            .set(self.device_requests.len() as f64);
        Ok(removed)
    }

    async fn sweep_device_requests(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let stale: Vec<String> = self
            .device_requests
            .iter()
            .filter(|entry| entry.expires_at <= cutoff)
            .map(|entry| entry.device_code.clone())
            .collect();
        let mut removed = 0;
        for device_code in stale {
            if self.remove_device_request(&device_code).await?.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
