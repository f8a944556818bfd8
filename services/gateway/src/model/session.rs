//! Session records for logged-in browser/CLI contexts.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A logged-in context keyed by a high-entropy opaque token.
///
/// Expired sessions are inert: the store treats them as absent and deletes
/// them on the next read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub identity_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
