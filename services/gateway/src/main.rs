//! Meshgate gateway HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, storage, identity providers, the mesh-control
//! client, and the HTTP router, then starts the API server, the metrics
//! listener, and the background expiry sweeps.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup
//! logic. Provider discovery runs here, so a misconfigured or unreachable
//! issuer fails startup instead of surfacing per request.
mod api;
mod app;
mod auth;
mod config;
mod mesh;
mod model;
mod observability;
mod store;

use anyhow::{Context, Result};
use app::{AppState, build_router};
use auth::apikey::ApiKeys;
use auth::device::DeviceFlow;
use auth::join_token::{DEFAULT_LEEWAY_SECS, JoinTokens};
use auth::keys::{SigningKey, generate_signing_key};
use auth::oauth2::OAuth2Provider;
use auth::oidc::OidcProvider;
use auth::provider::ProviderRegistry;
use auth::state::AuthStates;
use config::{GatewayConfig, ProviderKind};
use mesh::{AclSync, RealmManager};
use meshgate_mesh::{HttpMeshClient, MeshControl};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use store::memory::MemoryStore;
use url::Url;

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::from_env_or_yaml().context("gateway config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: GatewayConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("meshgate-gateway");
    let store = Arc::new(MemoryStore::new());
    let mesh: Arc<dyn MeshControl> =
        Arc::new(HttpMeshClient::new(&config.mesh_url, &config.mesh_token));
    let state = build_state(&config, store.clone(), mesh).await?;

    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));
    let sweep_task = tokio::spawn(store::sweep::run(
        store,
        Duration::from_secs(config.sweep_interval_seconds),
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, public_url = %config.public_url, "gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    sweep_task.abort();
    let _ = metrics_task.await;
    let _ = sweep_task.await;
    Ok(())
}

async fn build_state(
    config: &GatewayConfig,
    store: Arc<MemoryStore>,
    mesh: Arc<dyn MeshControl>,
) -> Result<AppState> {
    let public_url = Url::parse(&config.public_url).context("parse public_url")?;

    let signing_key = load_signing_key(config)?;
    let join_tokens = JoinTokens::new(
        config.public_url.trim_end_matches('/'),
        &signing_key,
        DEFAULT_LEEWAY_SECS,
    )
    .map_err(|err| anyhow::anyhow!("join token service: {err}"))?;

    let providers = build_providers(config).await?;
    if providers.is_empty() {
        tracing::warn!("no identity providers configured; interactive login is unavailable");
    }

    let acl = Arc::new(AclSync::new(mesh.clone()));
    let realms = Arc::new(RealmManager::new(store.clone(), mesh.clone(), acl));

    Ok(AppState {
        public_url,
        api_version: "v1".to_string(),
        store: store.clone(),
        mesh,
        providers: Arc::new(providers),
        auth_states: Arc::new(AuthStates::new(store.clone())),
        realms,
        join_tokens: Arc::new(join_tokens),
        api_keys: Arc::new(ApiKeys::new(store.clone())),
        device_flow: Arc::new(DeviceFlow::new(store)),
        session_ttl_seconds: config.session_ttl_seconds,
        join_token_ttl_seconds: config.join_token_ttl_seconds,
        authkey_ttl_seconds: config.authkey_ttl_seconds,
    })
}

fn load_signing_key(config: &GatewayConfig) -> Result<SigningKey> {
    match &config.signing_key_seed {
        Some(seed_hex) => {
            let bytes = hex::decode(seed_hex).context("decode signing_key_seed")?;
            let seed: [u8; 32] = bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("signing_key_seed must be 32 bytes of hex"))?;
            Ok(SigningKey::from_seed("configured", seed))
        }
        None => {
            tracing::warn!(
                "no signing key configured; join tokens will not survive a restart"
            );
            generate_signing_key()
        }
    }
}

async fn build_providers(config: &GatewayConfig) -> Result<ProviderRegistry> {
    let redirect_uri = format!(
        "{}/auth/callback",
        config.public_url.trim_end_matches('/')
    );
    let mut registry = ProviderRegistry::new();
    for provider in &config.providers {
        match provider.kind {
            ProviderKind::Oidc => {
                let scopes = provider
                    .scopes
                    .clone()
                    .unwrap_or_else(|| "openid email profile".to_string());
                let built = OidcProvider::discover(
                    &provider.name,
                    &provider.issuer,
                    &provider.client_id,
                    &provider.client_secret,
                    &redirect_uri,
                    scopes,
                )
                .await
                .with_context(|| format!("discover provider {}", provider.name))?;
                registry.register(Arc::new(built));
            }
            ProviderKind::Oauth2 => {
                let scopes = provider
                    .scopes
                    .clone()
                    .unwrap_or_else(|| "read:user user:email".to_string());
                let built = OAuth2Provider::new(
                    &provider.name,
                    &provider.issuer,
                    &provider.client_id,
                    &provider.client_secret,
                    &redirect_uri,
                    scopes,
                    provider
                        .authorization_endpoint
                        .as_deref()
                        .context("oauth2 provider missing authorization_endpoint")?,
                    provider
                        .token_endpoint
                        .clone()
                        .context("oauth2 provider missing token_endpoint")?,
                    provider
                        .profile_endpoint
                        .clone()
                        .context("oauth2 provider missing profile_endpoint")?,
                )
                .with_context(|| format!("configure provider {}", provider.name))?;
                registry.register(Arc::new(built));
            }
        }
        tracing::info!(provider = %provider.name, "registered identity provider");
    }
    Ok(registry)
}
