//! Identity records linking an external (issuer, subject) pair to one user.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user as known to an identity provider.
///
/// (issuer, subject) is unique; everything else is profile data that may be
/// refreshed on later logins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub issuer: String,
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
