//! Realm lifecycle management.
//!
//! # Purpose
//! Maps each authenticated identity to exactly one isolated mesh namespace
//! and mints namespace-scoped bootstrap credentials. Called on every login,
//! so every step is idempotent: the mesh-control service is the source of
//! truth for namespaces, "already exists" is success, and the ACL rule is
//! re-asserted (a cheap no-op when present).
//!
//! # Key invariants
//! - A realm is not considered created until the mesh-control service has
//!   confirmed the namespace; a failed downstream call leaves no realm row.
//! - ACL sync failure after realm creation is a hard error: a realm without
//!   its isolation rule is unreachable and must not pass as logged in.
use crate::mesh::policy::AclSync;
use crate::model::{Identity, Realm, namespace_for};
use crate::store::{DirectoryStore, StoreError};
use chrono::Utc;
use dashmap::DashMap;
use meshgate_mesh::{MeshControl, MeshError, PreauthKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum RealmError {
    #[error("mesh-control error: {0}")]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("acl policy sync failed: {0}")]
    PolicySync(#[source] MeshError),
}

pub struct RealmManager {
    store: Arc<dyn DirectoryStore>,
    mesh: Arc<dyn MeshControl>,
    acl: Arc<AclSync>,
    /// Per-key async locks serializing create paths. Entries are never
    /// evicted; growth is bounded by the number of realms.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RealmManager {
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        mesh: Arc<dyn MeshControl>,
        acl: Arc<AclSync>,
    ) -> Self {
        Self {
            store,
            mesh,
            acl,
            locks: DashMap::new(),
        }
    }

    /// Resolve the identity's realm, creating it on first login. Re-asserts
    /// the namespace and ACL rule on every call so state lost by a
    /// mesh-control restart heals on the next login.
    pub async fn realm_for_identity(&self, identity: &Identity) -> Result<Realm, RealmError> {
        let lock = self.lock_for(&format!("identity:{}", identity.id));
        let _guard = lock.lock().await;

        if let Some(realm) = self.store.find_realm_by_owner(&identity.id).await? {
            self.ensure_namespace(&realm.namespace).await?;
            self.acl
                .add_realm_to_policy(&realm.namespace)
                .await
                .map_err(RealmError::PolicySync)?;
            return Ok(realm);
        }

        let realm_id = Uuid::new_v4().simple().to_string();
        let namespace = namespace_for(&realm_id);
        // Namespace first: the realm row only exists once the mesh-control
        // service has confirmed the namespace.
        self.ensure_namespace(&namespace).await?;
        let realm = match self
            .store
            .insert_realm(Realm {
                id: realm_id,
                namespace: namespace.clone(),
                owner_identity_id: identity.id.clone(),
                created_at: Utc::now(),
            })
            .await
        {
            Ok(realm) => realm,
            Err(StoreError::Conflict(_)) => {
                // Another login for the same identity won the insert.
                self.store
                    .find_realm_by_owner(&identity.id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound("realm".into()))?
            }
            Err(err) => return Err(err.into()),
        };
        self.acl
            .add_realm_to_policy(&realm.namespace)
            .await
            .map_err(RealmError::PolicySync)?;
        metrics::counter!("meshgate_realm_logins_total").increment(1);
        Ok(realm)
    }

    /// Get-or-create a namespace in the mesh-control service. Idempotent
    /// under concurrent calls for the same name: in-process callers serialize
    /// on a per-name lock, and a cross-process duplicate-create race is
    /// tolerated by treating "already exists" as success.
    pub async fn ensure_namespace(&self, name: &str) -> Result<(), RealmError> {
        let lock = self.lock_for(&format!("namespace:{name}"));
        let _guard = lock.lock().await;

        let existing = self.mesh.list_namespaces().await?;
        if existing.iter().any(|ns| ns.name == name) {
            return Ok(());
        }
        match self.mesh.create_namespace(name).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_conflict() => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Mint a bootstrap credential for a namespace, ensuring the namespace
    /// exists first (self-healing after a mesh-control restart that lost
    /// transient state).
    pub async fn create_auth_key_by_name(
        &self,
        name: &str,
        ttl: Duration,
        reusable: bool,
    ) -> Result<PreauthKey, RealmError> {
        self.ensure_namespace(name).await?;
        let key = self
            .mesh
            .create_preauth_key(name, ttl.as_secs(), reusable)
            .await?;
        metrics::counter!("meshgate_auth_keys_issued_total").increment(1);
        Ok(key)
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
