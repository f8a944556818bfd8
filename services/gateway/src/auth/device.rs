//! Device-authorization flow for headless/CLI logins.
//!
//! # Purpose
//! An out-of-band login: the CLI shows a short user code, the user approves
//! it in an authenticated browser session, and the CLI polls its device code
//! until a terminal status arrives.
//!
//! # Key invariants
//! - Status transitions are one-directional: `pending` may become
//!   `approved`, `denied`, or `expired`; nothing leaves a terminal state.
//! - No two live requests share a user code (the store enforces the
//!   reservation; this service retries generation a bounded number of times).
//! - Expiry is derived on read: a pending request past its deadline is
//!   promoted to `expired` and the promotion is written back for later
//!   readers.
//! - The poll path deletes a request on first delivery of a terminal status,
//!   so a second poll can never replay the bootstrap credential.
use crate::model::{DeviceRequest, DeviceRequestStatus};
use crate::store::{CredentialStore, StoreError, StoreResult};
use chrono::{Duration, Utc};
use meshgate_mesh::PreauthKey;
use rand::Rng;
use std::sync::Arc;

pub const DEVICE_REQUEST_TTL_SECS: i64 = 900;
/// Interval the CLI is told to poll at.
pub const POLL_INTERVAL_SECS: u64 = 5;
/// 32 symbols; visually ambiguous characters (0/O, 1/I) are excluded.
pub const USER_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const USER_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum DeviceFlowError {
    #[error("device request not found")]
    NotFound,
    #[error("device request is not pending")]
    NotPending,
    #[error("could not allocate an unused user code")]
    CodesExhausted,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct DeviceFlow {
    store: Arc<dyn CredentialStore>,
}

impl DeviceFlow {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Start a new flow. User-code generation retries on collision with any
    /// live request and fails hard once attempts are exhausted.
    pub async fn create(&self) -> Result<DeviceRequest, DeviceFlowError> {
        let now = Utc::now();
        for _ in 0..USER_CODE_ATTEMPTS {
            let request = DeviceRequest {
                device_code: generate_device_code(),
                user_code: generate_user_code(),
                status: DeviceRequestStatus::Pending,
                created_at: now,
                expires_at: now + Duration::seconds(DEVICE_REQUEST_TTL_SECS),
                approved_by: None,
                credential: None,
            };
            match self.store.insert_device_request(request.clone()).await {
                Ok(()) => {
                    metrics::counter!("meshgate_device_requests_started_total").increment(1);
                    return Ok(request);
                }
                Err(StoreError::Conflict(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(DeviceFlowError::CodesExhausted)
    }

    pub async fn get_by_user_code(
        &self,
        user_code: &str,
    ) -> StoreResult<Option<DeviceRequest>> {
        match self.store.get_device_request_by_user_code(user_code).await? {
            Some(request) => Ok(Some(self.promote_expired(request).await?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_device_code(
        &self,
        device_code: &str,
    ) -> StoreResult<Option<DeviceRequest>> {
        match self.store.get_device_request(device_code).await? {
            Some(request) => Ok(Some(self.promote_expired(request).await?)),
            None => Ok(None),
        }
    }

    /// Legal only from `pending`; a terminal request is never overwritten.
    pub async fn approve(
        &self,
        user_code: &str,
        approver_identity_id: &str,
        credential: PreauthKey,
    ) -> Result<DeviceRequest, DeviceFlowError> {
        self.finish(user_code, |request| {
            request.status = DeviceRequestStatus::Approved;
            request.approved_by = Some(approver_identity_id.to_string());
            request.credential = Some(credential);
        })
        .await
    }

    pub async fn deny(
        &self,
        user_code: &str,
        approver_identity_id: &str,
    ) -> Result<DeviceRequest, DeviceFlowError> {
        self.finish(user_code, |request| {
            request.status = DeviceRequestStatus::Denied;
            request.approved_by = Some(approver_identity_id.to_string());
        })
        .await
    }

    /// Poll step for the waiting client. Returns the current request state;
    /// a terminal request is removed from the store before it is returned, so
    /// the credential (or the terminal verdict) is delivered at most once.
    pub async fn poll(&self, device_code: &str) -> StoreResult<Option<DeviceRequest>> {
        let Some(request) = self.get_by_device_code(device_code).await? else {
            return Ok(None);
        };
        if request.status.is_terminal() {
            self.store.remove_device_request(device_code).await?;
        }
        Ok(Some(request))
    }

    async fn finish(
        &self,
        user_code: &str,
        apply: impl FnOnce(&mut DeviceRequest),
    ) -> Result<DeviceRequest, DeviceFlowError> {
        let Some(mut request) = self.get_by_user_code(user_code).await? else {
            return Err(DeviceFlowError::NotFound);
        };
        if request.status != DeviceRequestStatus::Pending {
            return Err(DeviceFlowError::NotPending);
        }
        apply(&mut request);
        self.store.update_device_request(request.clone()).await?;
        metrics::counter!("meshgate_device_requests_finished_total",
            "status" => status_label(request.status))
        .increment(1);
        Ok(request)
    }

    async fn promote_expired(&self, mut request: DeviceRequest) -> StoreResult<DeviceRequest> {
        if request.status == DeviceRequestStatus::Pending && request.is_past_deadline(Utc::now())
        {
            request.status = DeviceRequestStatus::Expired;
            // Write the promotion back for subsequent readers; losing a race
            // here is harmless because expiry is re-derived on every read.
            if let Err(err) = self.store.update_device_request(request.clone()).await {
                if !matches!(err, StoreError::NotFound(_)) {
                    return Err(err);
                }
            }
        }
        Ok(request)
    }
}

fn generate_device_code() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

fn generate_user_code() -> String {
    let mut rng = rand::thread_rng();
    let mut chars = Vec::with_capacity(9);
    for i in 0..8 {
        if i == 4 {
            chars.push(b'-');
        }
        let idx = rng.gen_range(0..USER_CODE_ALPHABET.len());
        chars.push(USER_CODE_ALPHABET[idx]);
    }
    String::from_utf8(chars).unwrap_or_default()
}

fn status_label(status: DeviceRequestStatus) -> &'static str {
    match status {
        DeviceRequestStatus::Pending => "pending",
        DeviceRequestStatus::Approved => "approved",
        DeviceRequestStatus::Denied => "denied",
        DeviceRequestStatus::Expired => "expired",
    }
}
