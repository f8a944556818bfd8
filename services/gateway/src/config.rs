//! Gateway configuration.
//!
//! # Purpose
//! Environment variables cover the simple scalar settings; an optional YAML
//! file (pointed at by `MESHGATE_CONFIG`) overrides them and is the only
//! place identity providers are defined.
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    /// The service's externally visible base URL; join-token issuer and the
    /// origin redirect targets are validated against.
    pub public_url: String,
    pub mesh_url: String,
    pub mesh_token: String,
    pub session_ttl_seconds: i64,
    pub join_token_ttl_seconds: u64,
    pub authkey_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
    /// Hex-encoded 32-byte Ed25519 seed; an ephemeral key is generated when
    /// absent (join tokens then die with the process).
    pub signing_key_seed: Option<String>,
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub kind: ProviderKind,
    pub issuer: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Option<String>,
    /// OAuth2-only providers have no discovery; endpoints are explicit.
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub profile_endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Oidc,
    Oauth2,
}

#[derive(Debug, Deserialize)]
struct GatewayConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    public_url: Option<String>,
    mesh_url: Option<String>,
    mesh_token: Option<String>,
    session_ttl_seconds: Option<i64>,
    join_token_ttl_seconds: Option<u64>,
    authkey_ttl_seconds: Option<u64>,
    sweep_interval_seconds: Option<u64>,
    signing_key_seed: Option<String>,
    #[serde(default)]
    providers: Vec<ProviderConfig>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("MESHGATE_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse MESHGATE_BIND")?;
        let metrics_bind = std::env::var("MESHGATE_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:9090".to_string())
            .parse()
            .with_context(|| "parse MESHGATE_METRICS_BIND")?;
        let public_url = std::env::var("MESHGATE_PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());
        let mesh_url = std::env::var("MESHGATE_MESH_URL")
            .unwrap_or_else(|_| "http://localhost:50443".to_string());
        let mesh_token = std::env::var("MESHGATE_MESH_TOKEN").unwrap_or_default();
        Ok(Self {
            bind_addr,
            metrics_bind,
            public_url,
            mesh_url,
            mesh_token,
            session_ttl_seconds: 30 * 24 * 3600,
            join_token_ttl_seconds: 3600,
            authkey_ttl_seconds: 3600,
            sweep_interval_seconds: 60,
            signing_key_seed: std::env::var("MESHGATE_SIGNING_KEY_SEED").ok(),
            providers: Vec::new(),
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("MESHGATE_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read MESHGATE_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: GatewayConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse gateway config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.public_url {
            self.public_url = value;
        }
        if let Some(value) = override_cfg.mesh_url {
            self.mesh_url = value;
        }
        if let Some(value) = override_cfg.mesh_token {
            self.mesh_token = value;
        }
        if let Some(value) = override_cfg.session_ttl_seconds {
            self.session_ttl_seconds = value;
        }
        if let Some(value) = override_cfg.join_token_ttl_seconds {
            self.join_token_ttl_seconds = value;
        }
        if let Some(value) = override_cfg.authkey_ttl_seconds {
            self.authkey_ttl_seconds = value;
        }
        if let Some(value) = override_cfg.sweep_interval_seconds {
            self.sweep_interval_seconds = value;
        }
        if let Some(value) = override_cfg.signing_key_seed {
            self.signing_key_seed = Some(value);
        }
        if !override_cfg.providers.is_empty() {
            for provider in &override_cfg.providers {
                validate_provider(provider)?;
            }
            self.providers = override_cfg.providers;
        }
        Ok(())
    }
}

fn validate_provider(provider: &ProviderConfig) -> Result<()> {
    if provider.name.trim().is_empty() {
        bail!("provider name must not be empty");
    }
    if provider.kind == ProviderKind::Oauth2 {
        if provider.authorization_endpoint.is_none()
            || provider.token_endpoint.is_none()
            || provider.profile_endpoint.is_none()
        {
            bail!(
                "oauth2 provider {} needs authorization_endpoint, token_endpoint, and profile_endpoint",
                provider.name
            );
        }
    }
    Ok(())
}
