#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use gateway::app::AppState;
use gateway::auth::apikey::ApiKeys;
use gateway::auth::device::DeviceFlow;
use gateway::auth::join_token::JoinTokens;
use gateway::auth::keys::{SigningKey, generate_signing_key};
use gateway::auth::provider::{Provider, ProviderRegistry};
use gateway::auth::session::mint_session;
use gateway::auth::state::AuthStates;
use gateway::mesh::{AclSync, RealmManager};
use gateway::model::Identity;
use gateway::store::memory::MemoryStore;
use gateway::store::{CredentialStore, DirectoryStore};
use meshgate_mesh::{
    AclPolicy, MeshControl, MeshError, MeshNamespace, MeshNode, MeshResult, PreauthKey,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

pub const PUBLIC_URL: &str = "https://gw.test";

/// In-process stand-in for the mesh-control service.
#[derive(Default)]
pub struct FakeMesh {
    pub namespaces: Mutex<Vec<String>>,
    pub policy: Mutex<AclPolicy>,
    pub keys_issued: AtomicUsize,
}

#[async_trait]
impl MeshControl for FakeMesh {
    async fn list_namespaces(&self) -> MeshResult<Vec<MeshNamespace>> {
        Ok(self
            .namespaces
            .lock()
            .expect("lock")
            .iter()
            .map(|name| MeshNamespace {
                name: name.clone(),
                created_at: Some(Utc::now()),
            })
            .collect())
    }

    async fn create_namespace(&self, name: &str) -> MeshResult<MeshNamespace> {
        let mut namespaces = self.namespaces.lock().expect("lock");
        if namespaces.iter().any(|existing| existing == name) {
            return Err(MeshError::Api {
                status: 409,
                message: "namespace already exists".to_string(),
            });
        }
        namespaces.push(name.to_string());
        Ok(MeshNamespace {
            name: name.to_string(),
            created_at: Some(Utc::now()),
        })
    }

    async fn create_preauth_key(
        &self,
        namespace: &str,
        ttl_seconds: u64,
        reusable: bool,
    ) -> MeshResult<PreauthKey> {
        let n = self.keys_issued.fetch_add(1, Ordering::SeqCst);
        Ok(PreauthKey {
            key: format!("pak-{n}"),
            namespace: namespace.to_string(),
            reusable,
            expires_at: Utc::now() + Duration::seconds(ttl_seconds as i64),
        })
    }

    async fn list_nodes(&self, namespace: &str) -> MeshResult<Vec<MeshNode>> {
        Ok(vec![MeshNode {
            id: "node-1".to_string(),
            name: "worker-a".to_string(),
            namespace: namespace.to_string(),
            addresses: vec!["100.64.0.1".to_string()],
            online: true,
            last_seen: Some(Utc::now()),
        }])
    }

    async fn get_policy(&self) -> MeshResult<AclPolicy> {
        Ok(self.policy.lock().expect("lock").clone())
    }

    async fn put_policy(&self, policy: &AclPolicy) -> MeshResult<()> {
        *self.policy.lock().expect("lock") = policy.clone();
        Ok(())
    }
}

pub struct TestContext {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mesh: Arc<FakeMesh>,
    pub signing_key: SigningKey,
}

pub fn build_context(provider: Option<Arc<dyn Provider>>) -> TestContext {
    let store = Arc::new(MemoryStore::new());
    let mesh = Arc::new(FakeMesh::default());
    let acl = Arc::new(AclSync::new(mesh.clone()));
    let realms = Arc::new(RealmManager::new(store.clone(), mesh.clone(), acl));

    let signing_key = generate_signing_key().expect("signing key");
    let join_tokens = JoinTokens::new(PUBLIC_URL, &signing_key, 60).expect("join tokens");

    let mut providers = ProviderRegistry::new();
    if let Some(provider) = provider {
        providers.register(provider);
    }

    let state = AppState {
        public_url: Url::parse(PUBLIC_URL).expect("url"),
        api_version: "v1".to_string(),
        store: store.clone(),
        mesh: mesh.clone(),
        providers: Arc::new(providers),
        auth_states: Arc::new(AuthStates::new(store.clone())),
        realms,
        join_tokens: Arc::new(join_tokens),
        api_keys: Arc::new(ApiKeys::new(store.clone())),
        device_flow: Arc::new(DeviceFlow::new(store.clone())),
        session_ttl_seconds: 3600,
        join_token_ttl_seconds: 3600,
        authkey_ttl_seconds: 3600,
    };
    TestContext {
        state,
        store,
        mesh,
        signing_key,
    }
}

/// Insert an identity and a live session for it; returns the session token.
pub async fn login_session(ctx: &TestContext, subject: &str) -> (Identity, String) {
    let identity = ctx
        .store
        .upsert_identity("https://idp.test", subject, None, None)
        .await
        .expect("identity");
    let session = mint_session(&identity.id, 3600);
    ctx.store
        .insert_session(session.clone())
        .await
        .expect("session");
    (identity, session.id)
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}
