//! Wire types for the mesh-control service API.
//!
//! # Purpose
//! Namespaces, preauth keys, nodes, and the access policy document. Policy
//! types round-trip unknown fields so the gateway never clobbers rules or
//! settings it does not manage.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshNamespace {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// A mesh-control-issued bootstrap credential.
///
/// A machine presents this key when registering itself into the namespace it
/// was issued for. Single-use unless `reusable` was requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreauthKey {
    pub key: String,
    pub namespace: String,
    pub reusable: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshNode {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub addresses: Vec<String>,
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

/// The mesh-control service's access rule set.
///
/// Fields this service does not understand are carried in `extra` and written
/// back verbatim, so policy edits made out of band survive a sync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AclPolicy {
    #[serde(default)]
    pub acls: Vec<AclRule>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclRule {
    pub action: String,
    pub src: Vec<String>,
    pub dst: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AclRule {
    /// The isolation rule for one realm: the namespace may reach only itself.
    pub fn isolate(namespace: &str) -> Self {
        Self {
            action: "accept".to_string(),
            src: vec![namespace.to_string()],
            dst: vec![format!("{namespace}:*")],
            extra: serde_json::Map::new(),
        }
    }
}

impl AclPolicy {
    /// Whether a rule keyed by `namespace` (exact match on the rule's first
    /// source identifier) is already present.
    pub fn has_rule_for(&self, namespace: &str) -> bool {
        self.acls
            .iter()
            .any(|rule| rule.src.iter().any(|src| src == namespace))
    }
}
