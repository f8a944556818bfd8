//! Authentication components.
//!
//! # Purpose
//! Groups identity providers, login-state management, sessions, join tokens,
//! API keys, signing keys, and the device-authorization flow.
pub mod apikey;
pub mod device;
pub mod join_token;
pub mod keys;
pub mod oauth2;
pub mod oidc;
pub mod provider;
pub mod session;
pub mod state;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// Generate a URL-safe random token with `bytes` bytes of entropy.
pub fn random_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_tokens_are_distinct_and_urlsafe() {
        let a = random_token(32);
        let b = random_token(32);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
