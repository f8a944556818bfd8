//! API-key issuance and verification.
//!
//! # Purpose
//! Long-lived, scoped, revocable credentials for delegated access. Keys look
//! like `mgk_<id>_<secret>`; only a salted digest of the secret is stored, so
//! the plaintext exists exactly once, in the creation response.
//!
//! # Key invariants
//! - An expired key authenticates exactly like an unknown key.
//! - Scope checks are exact token matches over the comma-separated scope
//!   string, never substring containment.
use crate::auth::random_token;
use crate::model::ApiKey;
use crate::store::{CredentialStore, StoreResult};
use chrono::{DateTime, Utc};
use rand::RngCore;
use std::sync::Arc;
use subtle::ConstantTimeEq;

const KEY_PREFIX: &str = "mgk";

/// Creation result: the stored record plus the one-time plaintext.
pub struct NewApiKey {
    pub record: ApiKey,
    pub plaintext: String,
}

pub struct ApiKeys {
    store: Arc<dyn CredentialStore>,
}

impl ApiKeys {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        identity_id: &str,
        realm_id: &str,
        name: &str,
        scopes: &[String],
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<NewApiKey> {
        let mut id_bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut id_bytes);
        let id = hex::encode(id_bytes);

        let secret = random_token(32);
        let mut salt_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = hex::encode(salt_bytes);

        let record = ApiKey {
            id: id.clone(),
            identity_id: identity_id.to_string(),
            realm_id: realm_id.to_string(),
            name: name.to_string(),
            scopes: scopes.join(","),
            digest: digest(&salt, &secret),
            salt,
            created_at: Utc::now(),
            expires_at,
            last_used_at: None,
        };
        self.store.insert_api_key(record.clone()).await?;
        metrics::counter!("meshgate_api_keys_created_total").increment(1);
        Ok(NewApiKey {
            record,
            plaintext: format!("{KEY_PREFIX}_{id}_{secret}"),
        })
    }

    /// Resolve a raw key to its record. Unknown, mismatched, and expired keys
    /// are all reported as `None`.
    pub async fn authenticate(&self, raw: &str) -> StoreResult<Option<ApiKey>> {
        let Some((id, secret)) = parse_key(raw) else {
            return Ok(None);
        };
        let Some(record) = self.store.get_api_key(id).await? else {
            return Ok(None);
        };
        if record.is_expired(Utc::now()) {
            return Ok(None);
        }
        let candidate = digest(&record.salt, secret);
        if candidate.as_bytes().ct_eq(record.digest.as_bytes()).into() {
            self.store.touch_api_key(&record.id, Utc::now()).await?;
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }
}

/// Exact-token scope match over a comma-separated scope string.
pub fn has_scope(scopes: &str, target: &str) -> bool {
    scopes.split(',').map(str::trim).any(|scope| scope == target)
}

fn parse_key(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix(KEY_PREFIX)?.strip_prefix('_')?;
    let (id, secret) = rest.split_once('_')?;
    if id.is_empty() || secret.is_empty() {
        return None;
    }
    Some((id, secret))
}

fn digest(salt: &str, secret: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(secret.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::Duration;

    fn service() -> ApiKeys {
        ApiKeys::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn plaintext_authenticates_and_digest_is_stored() {
        let keys = service();
        let created = keys
            .create("ident-1", "realm-1", "ci", &["nodes:read".to_string()], None)
            .await
            .expect("create");
        assert!(created.plaintext.starts_with("mgk_"));
        assert!(!created.record.digest.contains(&created.plaintext));

        let found = keys
            .authenticate(&created.plaintext)
            .await
            .expect("auth")
            .expect("match");
        assert_eq!(found.id, created.record.id);
        assert!(found.last_used_at.is_none());
    }

    #[tokio::test]
    async fn wrong_secret_and_garbage_are_rejected() {
        let keys = service();
        let created = keys
            .create("ident-1", "realm-1", "ci", &["nodes:read".to_string()], None)
            .await
            .expect("create");

        let tampered = format!("mgk_{}_{}", created.record.id, "wrongsecret");
        assert!(keys.authenticate(&tampered).await.expect("auth").is_none());
        assert!(keys.authenticate("mgk_").await.expect("auth").is_none());
        assert!(keys.authenticate("bearer-ish").await.expect("auth").is_none());
    }

    #[tokio::test]
    async fn expired_key_behaves_like_unknown() {
        let keys = service();
        let created = keys
            .create(
                "ident-1",
                "realm-1",
                "ci",
                &["nodes:read".to_string()],
                Some(Utc::now() - Duration::seconds(1)),
            )
            .await
            .expect("create");
        assert!(
            keys.authenticate(&created.plaintext)
                .await
                .expect("auth")
                .is_none()
        );
    }

    #[test]
    fn scope_match_is_exact() {
        assert!(has_scope("nodes:read,deployer:connect", "nodes:read"));
        assert!(has_scope("nodes:read, deployer:connect", "deployer:connect"));
        assert!(!has_scope("nodes:readwrite", "nodes:read"));
        assert!(!has_scope("nodes:read", "nodes:readwrite"));
        assert!(!has_scope("", "nodes:read"));
    }
}
