//! brickx credential primitives shared by the auth service and its callers.
//!
//! # Purpose
//! Centralizes the credential format (claims, EdDSA signing, verification)
//! and the exact-match permission model so every component agrees on what a
//! valid credential is.
//!
//! # How it fits
//! The auth service signs credentials for local logins and exchanged upstream
//! tokens with [`TokenSigner`]. Anything holding the public key can verify
//! them with [`TokenVerifier`] without touching the RBAC store.
//!
//! # Key invariants
//! - Credentials are EdDSA/Ed25519 only; RSA/HS algorithms are rejected.
//! - A credential is invalid at or after its `exp` second.
//! - Permission checks are exact string membership, never prefix or wildcard.
//!
//! # Examples
//! ```rust
//! use brickx_authz::{CredentialSource, SigningKeyPair, TokenSigner, TokenVerifier};
//! use std::time::Duration;
//!
//! let key = SigningKeyPair::from_seed([7u8; 32]);
//! let signer = TokenSigner::new("brickx-auth", "brickx-services", Duration::from_secs(60), key.clone());
//! let verifier = TokenVerifier::new("brickx-auth", "brickx-services", 0, key.verifying_key());
//! let issued = signer
//!     .sign("alice", "admin", vec!["user:read".to_string()], CredentialSource::Local)
//!     .expect("sign");
//! let claims = verifier.verify(&issued.token).expect("verify");
//! assert!(claims.has_permission("user:read"));
//! ```

mod claims;
mod errors;
mod keys;
mod permission;
mod token;

pub use claims::{Claims, CredentialSource};
pub use errors::{AuthzError, AuthzResult};
pub use keys::{SigningKeyPair, VerifyingKeyMaterial};
pub use permission::normalize_permissions;
pub use token::{IssuedToken, TokenSigner, TokenVerifier};
