//! Periodic expiry sweeps for credential stores.
//!
//! # Purpose
//! Bounds storage growth independently of read-triggered lazy expiry: each
//! sweep runs on its own timer and removes sessions, auth states, and device
//! requests that passed their deadline (plus a grace period for device
//! requests, so a just-expired poller still gets its 410 before the row goes
//! away).
use crate::auth::state::AUTH_STATE_TTL_SECS;
use crate::store::CredentialStore;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Grace kept after a device request expires before the sweeper removes it.
pub const DEVICE_SWEEP_GRACE_SECS: i64 = 300;

/// Run all credential sweeps forever at `interval`. Spawned as a background
/// task; safe to run concurrently with foreground traffic.
pub async fn run(store: Arc<dyn CredentialStore>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        sweep_once(store.as_ref()).await;
    }
}

async fn sweep_once(store: &dyn CredentialStore) {
    let now = Utc::now();
    match store.sweep_sessions(now).await {
        Ok(removed) if removed > 0 => {
            metrics::counter!("meshgate_swept_sessions_total").increment(removed as u64);
            tracing::debug!(removed, "swept expired sessions");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = ?err, "session sweep failed"),
    }
    match store
        .sweep_auth_states(now - ChronoDuration::seconds(AUTH_STATE_TTL_SECS))
        .await
    {
        Ok(removed) if removed > 0 => {
            metrics::counter!("meshgate_swept_auth_states_total").increment(removed as u64);
            tracing::debug!(removed, "swept expired auth states");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = ?err, "auth state sweep failed"),
    }
    match store
        .sweep_device_requests(now - ChronoDuration::seconds(DEVICE_SWEEP_GRACE_SECS))
        .await
    {
        Ok(removed) if removed > 0 => {
            metrics::counter!("meshgate_swept_device_requests_total").increment(removed as u64);
            tracing::debug!(removed, "swept expired device requests");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = ?err, "device request sweep failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuthState, DeviceRequest, DeviceRequestStatus, Session};
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn sweep_once_clears_expired_state() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .insert_session(Session {
                id: "dead".to_string(),
                identity_id: "ident-1".to_string(),
                created_at: now - ChronoDuration::hours(2),
                expires_at: now - ChronoDuration::hours(1),
                last_used_at: now - ChronoDuration::hours(1),
            })
            .await
            .expect("session");
        store
            .insert_auth_state(AuthState {
                state: "old".to_string(),
                nonce: "n".to_string(),
                redirect_uri: "https://gw/".to_string(),
                provider: "test".to_string(),
                created_at: now - ChronoDuration::hours(1),
            })
            .await
            .expect("state");
        store
            .insert_device_request(DeviceRequest {
                device_code: "d1".to_string(),
                user_code: "AAAA-BBBB".to_string(),
                status: DeviceRequestStatus::Pending,
                created_at: now - ChronoDuration::hours(1),
                expires_at: now - ChronoDuration::minutes(30),
                approved_by: None,
                credential: None,
            })
            .await
            .expect("request");

        sweep_once(&store).await;

        assert!(store.get_session("dead").await.expect("get").is_none());
        assert!(store.take_auth_state("old").await.expect("take").is_none());
        assert!(store.get_device_request("d1").await.expect("get").is_none());
    }
}
