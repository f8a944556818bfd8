//! Identity-provider abstraction.
//!
//! # Purpose
//! A uniform contract over heterogeneous identity providers: OAuth2-only
//! providers that fetch a profile from a REST endpoint, and OIDC providers
//! that verify a signed identity token. The registry is built once at startup
//! and injected through `AppState`, so tests can swap in fakes.
//!
//! # Key invariants
//! - Provider construction performs discovery and fails fast; a registered
//!   provider is always usable at request time.
//! - `exchange_code` failures are typed so the login handler can distinguish
//!   a failed token exchange from a failed identity-token verification.
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Identity payload extracted from a completed provider exchange.
#[derive(Debug, Clone)]
pub struct UserInfo {
    pub issuer: String,
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The code-for-token exchange with the provider failed.
    #[error("token exchange failed: {0}")]
    Exchange(String),
    /// The identity token came back but did not verify.
    #[error("identity token verification failed: {0}")]
    Verify(String),
    /// The profile endpoint call failed (OAuth2-only providers).
    #[error("profile fetch failed: {0}")]
    Profile(String),
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    fn issuer(&self) -> &str;
    /// Authorization URL to redirect the user to. `nonce` is embedded for
    /// providers that verify it in the identity token; others ignore it.
    fn auth_url(&self, state: &str, nonce: &str) -> String;
    async fn exchange_code(&self, code: &str, nonce: &str) -> Result<UserInfo, ProviderError>;
}

/// Configured providers keyed by name.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers
            .insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.values()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
