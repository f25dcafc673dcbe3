//! Verification of credentials minted by an external trust authority.
//!
//! The exchanger depends only on [`ExternalVerifier`]; the OIDC/JWKS
//! implementation lives in [`crate::auth::oidc`]. Error detail stays
//! server-side: callers map every [`ExternalError`] to the same
//! authentication failure.
use async_trait::async_trait;

/// Identity asserted by a verified upstream credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalIdentity {
    pub issuer: String,
    pub subject: String,
    pub groups: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExternalError {
    #[error("no external issuers configured")]
    NoIssuers,
    #[error("missing issuer")]
    MissingIssuer,
    #[error("issuer not allowed")]
    IssuerNotAllowed,
    #[error("missing subject")]
    MissingSubject,
    #[error("missing key id")]
    MissingKeyId,
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,
    #[error("invalid jwk: {0}")]
    InvalidJwk(String),
    #[error("jwks key not found")]
    JwksKeyNotFound,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("invalid claim: {0}")]
    InvalidClaim(String),
    #[error("rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait ExternalVerifier: Send + Sync {
    async fn verify_external(&self, token: &str) -> Result<PrincipalIdentity, ExternalError>;
}

/// Verifier used when exchange is not configured. Rejects everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledExternalVerifier;

#[async_trait]
impl ExternalVerifier for DisabledExternalVerifier {
    async fn verify_external(&self, _token: &str) -> Result<PrincipalIdentity, ExternalError> {
        Err(ExternalError::NoIssuers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_verifier_rejects() {
        let err = DisabledExternalVerifier
            .verify_external("anything")
            .await
            .expect_err("disabled");
        assert!(matches!(err, ExternalError::NoIssuers));
    }
}
