//! Join-token signing key generation.
//!
//! # Purpose
//! Produce the Ed25519 key the gateway signs join tokens with. The private
//! key is a raw 32-byte seed; the public key is derived from it so the two
//! can never drift apart. The `kid` is random and not a secret.
use anyhow::Result;
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use rand::RngCore;

#[derive(Debug, Clone)]
pub struct SigningKey {
    pub kid: String,
    pub private_key: [u8; 32],
    pub public_key: [u8; 32],
}

impl SigningKey {
    /// Rebuild a key from a stored seed.
    pub fn from_seed(kid: impl Into<String>, seed: [u8; 32]) -> Self {
        let signing_key = Ed25519SigningKey::from_bytes(&seed);
        Self {
            kid: kid.into(),
            private_key: seed,
            public_key: signing_key.verifying_key().to_bytes(),
        }
    }
}

/// Generate a fresh Ed25519 signing key with a random `kid`.
pub fn generate_signing_key() -> Result<SigningKey> {
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);

    let mut kid_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut kid_bytes);

    Ok(SigningKey::from_seed(hex::encode(kid_bytes), seed))
}
