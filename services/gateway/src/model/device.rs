//! Device-authorization-flow request records.
use chrono::{DateTime, Utc};
use meshgate_mesh::PreauthKey;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle of one device-authorization attempt.
///
/// Transitions are one-directional: `Pending` may become `Approved`,
/// `Denied`, or `Expired`, and the latter three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRequestStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

impl DeviceRequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DeviceRequestStatus::Pending)
    }
}

/// One device-authorization-flow attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRequest {
    /// High-entropy machine-readable code the CLI polls with (32 hex chars).
    pub device_code: String,
    /// Short human-typeable code, `XXXX-XXXX` from a restricted alphabet.
    pub user_code: String,
    pub status: DeviceRequestStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub approved_by: Option<String>,
    /// Bootstrap credential set on approval, delivered to the poller once.
    pub credential: Option<PreauthKey>,
}

impl DeviceRequest {
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
