//! OAuth2-only provider (GitHub style).
//!
//! # Purpose
//! Implements [`Provider`] for identity providers that issue plain OAuth2
//! access tokens and expose the user's profile on a REST endpoint instead of
//! in a signed identity token. The subject comes from the profile's stable
//! numeric/string `id`.
use crate::auth::provider::{Provider, ProviderError, UserInfo};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

pub struct OAuth2Provider {
    name: String,
    issuer: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: String,
    authorization_endpoint: Url,
    token_endpoint: String,
    profile_endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

impl OAuth2Provider {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        scopes: impl Into<String>,
        authorization_endpoint: &str,
        token_endpoint: impl Into<String>,
        profile_endpoint: impl Into<String>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            name: name.into(),
            issuer: issuer.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scopes: scopes.into(),
            authorization_endpoint: Url::parse(authorization_endpoint)?,
            token_endpoint: token_endpoint.into(),
            profile_endpoint: profile_endpoint.into(),
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl Provider for OAuth2Provider {
    fn name(&self) -> &str {
        &self.name
    }

    fn issuer(&self) -> &str {
        &self.issuer
    }

    fn auth_url(&self, state: &str, _nonce: &str) -> String {
        let mut url = self.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scopes)
            .append_pair("state", state);
        url.to_string()
    }

    async fn exchange_code(&self, code: &str, _nonce: &str) -> Result<UserInfo, ProviderError> {
        let response = self
            .client
            .post(&self.token_endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.redirect_uri),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
            ])
            .send()
            .await
            .map_err(|err| ProviderError::Exchange(err.to_string()))?;
        if !response.status().is_success() {
            return Err(ProviderError::Exchange(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Exchange(format!("token response: {err}")))?;
        let access_token = body
            .access_token
            .ok_or_else(|| ProviderError::Exchange("response had no access_token".to_string()))?;

        let profile: Value = self
            .client
            .get(&self.profile_endpoint)
            .bearer_auth(&access_token)
            .header(reqwest::header::USER_AGENT, "meshgate")
            .send()
            .await
            .map_err(|err| ProviderError::Profile(err.to_string()))?
            .error_for_status()
            .map_err(|err| ProviderError::Profile(err.to_string()))?
            .json()
            .await
            .map_err(|err| ProviderError::Profile(format!("profile decode: {err}")))?;

        let subject = subject_from_profile(&profile)
            .ok_or_else(|| ProviderError::Profile("profile had no id".to_string()))?;
        let email = profile
            .get("email")
            .and_then(Value::as_str)
            .map(str::to_string);
        let display_name = profile
            .get("name")
            .or_else(|| profile.get("login"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(UserInfo {
            issuer: self.issuer.clone(),
            subject,
            email,
            display_name,
        })
    }
}

fn subject_from_profile(profile: &Value) -> Option<String> {
    match profile.get("id") {
        Some(Value::Number(id)) => Some(id.to_string()),
        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
        _ => None,
    }
}
