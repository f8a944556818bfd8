//! CSRF/replay guard for one in-flight OIDC login.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Single-use login state: consumed on first validation, expired after a
/// fixed TTL either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthState {
    pub state: String,
    pub nonce: String,
    pub redirect_uri: String,
    pub provider: String,
    pub created_at: DateTime<Utc>,
}
