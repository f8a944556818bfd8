//! Entity definitions shared by the store and HTTP API.
//!
//! # Purpose
//! Identities, realms, sessions, auth states, API keys, and device requests.
mod apikey;
mod authstate;
mod device;
mod identity;
mod realm;
mod session;

pub use apikey::ApiKey;
pub use authstate::AuthState;
pub use device::{DeviceRequest, DeviceRequestStatus};
pub use identity::Identity;
pub use realm::{Realm, namespace_for};
pub use session::Session;
