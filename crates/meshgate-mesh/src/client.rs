//! HTTP implementation of [`MeshControl`].
//!
//! # Purpose
//! Talks to the mesh-control service's REST API with a bearer token. Errors
//! distinguish transport failures, non-2xx API responses (with status and
//! body), and payload decode failures so callers can react precisely.
use crate::types::{AclPolicy, MeshNamespace, MeshNode, PreauthKey};
use crate::{MeshControl, MeshError, MeshResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone)]
pub struct HttpMeshClient {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct NamespaceListBody {
    namespaces: Vec<MeshNamespace>,
}

#[derive(Debug, Deserialize)]
struct NamespaceBody {
    namespace: MeshNamespace,
}

#[derive(Debug, Deserialize)]
struct PreauthKeyBody {
    preauth_key: PreauthKey,
}

#[derive(Debug, Deserialize)]
struct NodeListBody {
    nodes: Vec<MeshNode>,
}

impl HttpMeshClient {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> MeshResult<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MeshError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| MeshError::Decode(err.to_string()))
    }

    async fn expect_success(response: reqwest::Response) -> MeshResult<()> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MeshError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MeshControl for HttpMeshClient {
    async fn list_namespaces(&self) -> MeshResult<Vec<MeshNamespace>> {
        let response = self
            .client
            .get(self.url("/api/v1/namespace"))
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        let body: NamespaceListBody = Self::decode(response).await?;
        Ok(body.namespaces)
    }

    async fn create_namespace(&self, name: &str) -> MeshResult<MeshNamespace> {
        let response = self
            .client
            .post(self.url("/api/v1/namespace"))
            .bearer_auth(&self.api_token)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        let body: NamespaceBody = Self::decode(response).await?;
        Ok(body.namespace)
    }

    async fn create_preauth_key(
        &self,
        namespace: &str,
        ttl_seconds: u64,
        reusable: bool,
    ) -> MeshResult<PreauthKey> {
        let response = self
            .client
            .post(self.url("/api/v1/preauthkey"))
            .bearer_auth(&self.api_token)
            .json(&serde_json::json!({
                "namespace": namespace,
                "ttl_seconds": ttl_seconds,
                "reusable": reusable,
            }))
            .send()
            .await?;
        let body: PreauthKeyBody = Self::decode(response).await?;
        Ok(body.preauth_key)
    }

    async fn list_nodes(&self, namespace: &str) -> MeshResult<Vec<MeshNode>> {
        let response = self
            .client
            .get(self.url("/api/v1/node"))
            .query(&[("namespace", namespace)])
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        let body: NodeListBody = Self::decode(response).await?;
        Ok(body.nodes)
    }

    async fn get_policy(&self) -> MeshResult<AclPolicy> {
        let response = self
            .client
            .get(self.url("/api/v1/policy"))
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn put_policy(&self, policy: &AclPolicy) -> MeshResult<()> {
        let response = self
            .client
            .put(self.url("/api/v1/policy"))
            .bearer_auth(&self.api_token)
            .json(policy)
            .send()
            .await?;
        Self::expect_success(response).await
    }
}
