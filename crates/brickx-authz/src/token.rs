//! Credential signing and verification.
//!
//! # Purpose
//! [`TokenSigner`] mints EdDSA JWTs carrying [`Claims`]; [`TokenVerifier`]
//! checks signature, algorithm, issuer, audience, and expiry.
//!
//! # Key invariants
//! - Verification pins `EdDSA`; a token whose header names any other
//!   algorithm is rejected before signature checks.
//! - Expiry is strict: a credential is rejected when `now >= exp + leeway`.
//!   `jsonwebtoken` alone accepts `exp == now`, so the bound is re-checked here.
use crate::{AuthzError, AuthzResult, Claims, CredentialSource, SigningKeyPair, VerifyingKeyMaterial};
use crate::permission::normalize_permissions;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Header, Validation};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A freshly signed credential together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

#[derive(Debug, Clone)]
pub struct TokenSigner {
    issuer: String,
    audience: String,
    ttl: Duration,
    key: SigningKeyPair,
}

impl TokenSigner {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        ttl: Duration,
        key: SigningKeyPair,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            ttl,
            key,
        }
    }

    /// Sign a credential for `subject` with the given role and permission
    /// snapshot. Duplicate permissions are dropped.
    ///
    /// # Errors
    /// - [`AuthzError::TtlOutOfRange`] if `now + ttl` does not fit an `i64`
    ///   epoch second.
    pub fn sign(
        &self,
        subject: &str,
        role: &str,
        permissions: Vec<String>,
        source: CredentialSource,
    ) -> AuthzResult<IssuedToken> {
        let now = now_epoch_seconds();
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or(AuthzError::TtlOutOfRange(self.ttl))?;
        let claims = Claims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: subject.to_string(),
            role: role.to_string(),
            permissions: normalize_permissions(permissions),
            iat: now,
            exp,
            src: source,
        };
        let token = self.sign_claims(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    /// Sign arbitrary claims as-is. Callers are responsible for `iat`/`exp`.
    pub fn sign_claims(&self, claims: &Claims) -> AuthzResult<String> {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.key.kid().to_string());
        let encoding_key = self.key.encoding_key()?;
        Ok(jsonwebtoken::encode(&header, claims, &encoding_key)?)
    }
}

#[derive(Debug, Clone)]
pub struct TokenVerifier {
    issuer: String,
    audience: String,
    leeway: u64,
    key: VerifyingKeyMaterial,
}

impl TokenVerifier {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        leeway: u64,
        key: VerifyingKeyMaterial,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            leeway,
            key,
        }
    }

    pub fn verify(&self, token: &str) -> AuthzResult<Claims> {
        self.verify_at(token, now_epoch_seconds())
    }

    /// Verify against an explicit clock reading (seconds since epoch).
    pub fn verify_at(&self, token: &str, now: i64) -> AuthzResult<Claims> {
        let header = jsonwebtoken::decode_header(token)?;
        if header.alg != Algorithm::EdDSA {
            return Err(AuthzError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = self.leeway;

        let decoding_key = self.key.decoding_key()?;
        let data = jsonwebtoken::decode::<Claims>(token, &decoding_key, &validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthzError::Expired,
                _ => AuthzError::Jwt(err),
            },
        )?;
        let leeway = i64::try_from(self.leeway).unwrap_or(i64::MAX);
        if data.claims.is_expired_at(now.saturating_sub(leeway)) {
            return Err(AuthzError::Expired);
        }
        Ok(data.claims)
    }
}

pub(crate) fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs() as i64
}
