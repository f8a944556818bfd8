//! Auth-state management for in-flight OIDC logins.
//!
//! # Purpose
//! Each login redirect is protected by a short-lived, single-use state record
//! carrying two independent random tokens (CSRF state and OIDC nonce) plus
//! the validated redirect target. Validation consumes the record whether or
//! not it is accepted, so a state token can never be replayed.
use crate::auth::random_token;
use crate::model::AuthState;
use crate::store::{CredentialStore, StoreResult};
use chrono::{Duration, Utc};
use std::sync::Arc;
use url::Url;

/// States older than this are rejected even if still present.
pub const AUTH_STATE_TTL_SECS: i64 = 600;

pub struct AuthStates {
    store: Arc<dyn CredentialStore>,
}

impl AuthStates {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, redirect_uri: &str, provider: &str) -> StoreResult<AuthState> {
        let state = AuthState {
            state: random_token(32),
            nonce: random_token(32),
            redirect_uri: redirect_uri.to_string(),
            provider: provider.to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_auth_state(state.clone()).await?;
        Ok(state)
    }

    /// Consume and return the state record. Returns `None` for unknown and
    /// expired states alike; the record is deleted in every case.
    pub async fn validate(&self, state: &str) -> StoreResult<Option<AuthState>> {
        let Some(record) = self.store.take_auth_state(state).await? else {
            return Ok(None);
        };
        let deadline = record.created_at + Duration::seconds(AUTH_STATE_TTL_SECS);
        if deadline <= Utc::now() {
            return Ok(None);
        }
        Ok(Some(record))
    }
}

/// Whether `redirect` stays on the service's own origin.
///
/// Path-only targets are same-origin by construction; absolute URLs must
/// match the public URL's scheme, host, and port exactly.
pub fn redirect_is_same_origin(public_url: &Url, redirect: &str) -> bool {
    if redirect.starts_with('/') && !redirect.starts_with("//") {
        return true;
    }
    let Ok(target) = Url::parse(redirect) else {
        return false;
    };
    target.scheme() == public_url.scheme()
        && target.host_str() == public_url.host_str()
        && target.port_or_known_default() == public_url.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn states() -> AuthStates {
        AuthStates::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn state_is_single_use() {
        let states = states();
        let created = states.create("/app", "test").await.expect("create");

        let first = states.validate(&created.state).await.expect("validate");
        assert!(first.is_some());
        assert_eq!(first.unwrap().nonce, created.nonce);

        // Second validation fails even within the TTL window.
        let second = states.validate(&created.state).await.expect("validate");
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn unknown_state_is_rejected() {
        let states = states();
        assert!(states.validate("missing").await.expect("validate").is_none());
    }

    #[tokio::test]
    async fn state_and_nonce_are_independent() {
        let states = states();
        let created = states.create("/app", "test").await.expect("create");
        assert_ne!(created.state, created.nonce);
    }

    #[test]
    fn redirect_origin_validation() {
        let public = Url::parse("https://gw.example.com").expect("url");
        assert!(redirect_is_same_origin(&public, "/machines"));
        assert!(redirect_is_same_origin(
            &public,
            "https://gw.example.com/machines"
        ));
        assert!(!redirect_is_same_origin(&public, "//evil.example.com/x"));
        assert!(!redirect_is_same_origin(&public, "https://evil.example.com/"));
        assert!(!redirect_is_same_origin(&public, "http://gw.example.com/"));
        assert!(!redirect_is_same_origin(&public, "not a url"));
    }
}
