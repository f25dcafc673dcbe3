//! Ed25519 key material for brickx credentials.
//!
//! # Purpose
//! Loads, generates, and converts the single service signing key into the
//! forms `jsonwebtoken` expects.
//!
//! # Key invariants
//! - The private key is kept as a raw 32-byte seed; the public key is always
//!   derivable from it and a configured public key must match.
//! - `kid` is derived from the public key, so restarts with the same key
//!   produce the same `kid`.
//! - Private key material is never printed by `Debug`.
use crate::{AuthzError, AuthzResult};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey};
use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::path::Path;

const KID_HEX_LEN: usize = 16;

/// Service signing key: Ed25519 seed plus its public half.
#[derive(Clone)]
pub struct SigningKeyPair {
    kid: String,
    private_key: [u8; 32],
    public_key: [u8; 32],
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("kid", &self.kid)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl SigningKeyPair {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = Ed25519SigningKey::from_bytes(&seed);
        let public_key = signing_key.verifying_key().to_bytes();
        Self {
            kid: derive_kid(&public_key),
            private_key: seed,
            public_key,
        }
    }

    /// Generate a fresh random key. Credentials signed with it do not survive
    /// a restart.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    /// Parse a PKCS#8 PEM private key and, when given, an SPKI PEM public key.
    ///
    /// # Errors
    /// - [`AuthzError::Key`] if either PEM is not Ed25519 or the public key
    ///   does not belong to the private key.
    pub fn from_pem(private_pem: &str, public_pem: Option<&str>) -> AuthzResult<Self> {
        let signing_key = Ed25519SigningKey::from_pkcs8_pem(private_pem)
            .map_err(|err| AuthzError::Key(format!("parse Ed25519 private key: {err}")))?;
        let pair = Self::from_seed(signing_key.to_bytes());
        if let Some(public_pem) = public_pem {
            let configured = VerifyingKey::from_public_key_pem(public_pem)
                .map_err(|err| AuthzError::Key(format!("parse Ed25519 public key: {err}")))?;
            if configured.to_bytes() != pair.public_key {
                return Err(AuthzError::Key(
                    "public key does not match private key".to_string(),
                ));
            }
        }
        Ok(pair)
    }

    pub fn from_pem_files(private_path: &Path, public_path: Option<&Path>) -> AuthzResult<Self> {
        let private_pem = std::fs::read_to_string(private_path)?;
        let public_pem = match public_path {
            Some(path) => Some(std::fs::read_to_string(path)?),
            None => None,
        };
        Self::from_pem(&private_pem, public_pem.as_deref())
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.public_key
    }

    pub fn verifying_key(&self) -> VerifyingKeyMaterial {
        VerifyingKeyMaterial {
            kid: self.kid.clone(),
            public_key: self.public_key,
        }
    }

    /// Re-derive the public key from the seed and compare.
    pub fn validate(&self) -> AuthzResult<()> {
        let derived = Ed25519SigningKey::from_bytes(&self.private_key)
            .verifying_key()
            .to_bytes();
        if derived != self.public_key {
            return Err(AuthzError::Key(
                "public key does not match private key".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn encoding_key(&self) -> AuthzResult<EncodingKey> {
        self.validate()?;
        // jsonwebtoken reads EdDSA private keys as PKCS#8 DER.
        let der = Ed25519SigningKey::from_bytes(&self.private_key)
            .to_pkcs8_der()
            .map_err(|err| AuthzError::Key(format!("encode Ed25519 key: {err}")))?;
        Ok(EncodingKey::from_ed_der(der.as_bytes()))
    }
}

/// Public half of the service key, enough to verify credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyingKeyMaterial {
    pub kid: String,
    pub public_key: [u8; 32],
}

impl VerifyingKeyMaterial {
    pub(crate) fn decoding_key(&self) -> AuthzResult<DecodingKey> {
        let x = URL_SAFE_NO_PAD.encode(self.public_key);
        Ok(DecodingKey::from_ed_components(&x)?)
    }
}

fn derive_kid(public_key: &[u8; 32]) -> String {
    let digest = Sha256::digest(public_key);
    let mut kid = hex::encode(digest);
    kid.truncate(KID_HEX_LEN);
    kid
}
