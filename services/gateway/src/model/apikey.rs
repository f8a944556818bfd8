//! API-key records.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A long-lived, scoped, revocable credential.
///
/// Only a salted digest of the key secret is stored; the plaintext is
/// returned once at creation and is not recoverable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: String,
    pub identity_id: String,
    pub realm_id: String,
    pub name: String,
    /// Comma-separated scope tokens, e.g. `"nodes:read,deployer:connect"`.
    pub scopes: String,
    pub salt: String,
    pub digest: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}
