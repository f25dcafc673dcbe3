use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("key error: {0}")]
    Key(String),
    #[error("credential expired")]
    Expired,
    #[error("unsupported credential algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("credential lifetime out of range: {0:?}")]
    TtlOutOfRange(std::time::Duration),
    #[error("io error reading key material: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthzError {
    /// True when the failure came from the presented credential rather than
    /// from local key material.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            AuthzError::Jwt(_) | AuthzError::Expired | AuthzError::UnsupportedAlgorithm(_)
        )
    }
}

pub type AuthzResult<T> = Result<T, AuthzError>;
