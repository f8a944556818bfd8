//! Realm records and the namespace naming function.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An isolated mesh namespace owned by exactly one identity.
///
/// The realm ID is random and never reused; the mesh namespace name is a pure
/// function of it (see [`namespace_for`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Realm {
    pub id: String,
    pub namespace: String,
    pub owner_identity_id: String,
    pub created_at: DateTime<Utc>,
}

/// Derive the mesh-control namespace name for a realm ID.
pub fn namespace_for(realm_id: &str) -> String {
    format!("r-{realm_id}")
}
