//! Join-token minting and verification.
//!
//! # Purpose
//! A join token is a signed, time-bounded claim that lets a new machine
//! exchange the token for a mesh bootstrap credential without any server-side
//! lookup: validity is signature plus expiry, nothing else.
//!
//! # Key invariants
//! - Tokens are always EdDSA (Ed25519); no other algorithm verifies.
//! - Claims carry `iss` (the gateway's public URL), `sub` (the realm ID),
//!   `ns` (the mesh namespace), `iat`, and `exp`.
//! - Clock skew tolerance is small (60 s by default).
//!
//! # Statelessness tradeoff
//! There is no revocation list. A leaked token remains valid until its
//! expiry, which is why callers should keep TTLs in the minutes-to-hours
//! range rather than days.
//!
//! # Concurrency model
//! The encoding/decoding key material is converted once at construction and
//! shared immutably; minting and validation are lock-free.
use crate::auth::keys::SigningKey;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use ed25519_dalek::pkcs8::EncodePrivateKey;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_LEEWAY_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinClaims {
    pub iss: String,
    /// Realm ID the joining machine will belong to.
    pub sub: String,
    /// Mesh namespace derived from the realm ID.
    pub ns: String,
    pub iat: i64,
    pub exp: i64,
}

/// Validation failures, split so the HTTP layer can choose 400 vs 401.
#[derive(Debug, thiserror::Error)]
pub enum JoinTokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    Signature,
    #[error("token expired")]
    Expired,
    #[error("key error: {0}")]
    Key(String),
}

pub struct JoinTokens {
    issuer: String,
    kid: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    leeway: u64,
}

impl std::fmt::Debug for JoinTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinTokens")
            .field("issuer", &self.issuer)
            .field("kid", &self.kid)
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}

impl JoinTokens {
    /// Build the service from a signing key. Key material is converted to the
    /// formats `jsonwebtoken` expects exactly once, here.
    pub fn new(issuer: impl Into<String>, key: &SigningKey, leeway: u64) -> Result<Self, JoinTokenError> {
        let signing_key = Ed25519SigningKey::from_bytes(&key.private_key);
        if signing_key.verifying_key().to_bytes() != key.public_key {
            return Err(JoinTokenError::Key(
                "public key does not match private seed".to_string(),
            ));
        }
        let der = signing_key
            .to_pkcs8_der()
            .map_err(|err| JoinTokenError::Key(format!("encode Ed25519 key: {err}")))?;
        let encoding_key = EncodingKey::from_ed_der(der.as_bytes());
        let x = URL_SAFE_NO_PAD.encode(key.public_key);
        let decoding_key =
            DecodingKey::from_ed_components(&x).map_err(|_| JoinTokenError::Signature)?;
        Ok(Self {
            issuer: issuer.into(),
            kid: key.kid.clone(),
            encoding_key,
            decoding_key,
            leeway,
        })
    }

    pub fn generate(
        &self,
        realm_id: &str,
        namespace: &str,
        ttl: Duration,
    ) -> Result<String, JoinTokenError> {
        let now = Utc::now().timestamp();
        self.generate_at(realm_id, namespace, now, now + ttl.as_secs() as i64)
    }

    fn generate_at(
        &self,
        realm_id: &str,
        namespace: &str,
        iat: i64,
        exp: i64,
    ) -> Result<String, JoinTokenError> {
        let claims = JoinClaims {
            iss: self.issuer.clone(),
            sub: realm_id.to_string(),
            ns: namespace.to_string(),
            iat,
            exp,
        };
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.kid.clone());
        jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|_| JoinTokenError::Key("token encoding failed".to_string()))
    }

    /// Verify signature and expiry; no store lookup is involved.
    pub fn validate(&self, token: &str) -> Result<JoinClaims, JoinTokenError> {
        let header = jsonwebtoken::decode_header(token).map_err(|_| JoinTokenError::Malformed)?;
        if header.alg != Algorithm::EdDSA {
            return Err(JoinTokenError::Signature);
        }
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.validate_aud = false;
        validation.leeway = self.leeway;
        match jsonwebtoken::decode::<JoinClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => Err(classify(err)),
        }
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> JoinTokenError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => JoinTokenError::Expired,
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::ImmatureSignature => JoinTokenError::Signature,
        _ => JoinTokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::keys::{SigningKey as GatewayKey, generate_signing_key};

    const ISSUER: &str = "https://gw.example.com";

    fn tokens() -> JoinTokens {
        let key = generate_signing_key().expect("key");
        JoinTokens::new(ISSUER, &key, 0).expect("service")
    }

    #[test]
    fn roundtrip_preserves_claims() {
        let tokens = tokens();
        let token = tokens
            .generate("abc123", "r-abc123", Duration::from_secs(3600))
            .expect("generate");
        let claims = tokens.validate(&token).expect("validate");
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.sub, "abc123");
        assert_eq!(claims.ns, "r-abc123");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_distinct_from_garbage() {
        let tokens = tokens();
        let now = Utc::now().timestamp();
        let token = tokens
            .generate_at("abc123", "r-abc123", now - 3700, now - 100)
            .expect("generate");
        let err = tokens.validate(&token).expect_err("expired");
        assert!(matches!(err, JoinTokenError::Expired));

        let err = tokens.validate("not-a-token").expect_err("malformed");
        assert!(matches!(err, JoinTokenError::Malformed));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let ours = tokens();
        let theirs = tokens();
        let token = theirs
            .generate("abc123", "r-abc123", Duration::from_secs(3600))
            .expect("generate");
        let err = ours.validate(&token).expect_err("foreign key");
        assert!(matches!(err, JoinTokenError::Signature));
    }

    #[test]
    fn mismatched_key_material_fails_construction() {
        let a = generate_signing_key().expect("key");
        let b = generate_signing_key().expect("key");
        let broken = GatewayKey {
            kid: a.kid,
            private_key: a.private_key,
            public_key: b.public_key,
        };
        let err = JoinTokens::new(ISSUER, &broken, 0).expect_err("mismatch");
        assert!(matches!(err, JoinTokenError::Key(_)));
    }
}
